// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and routes each subcommand to its
// use case. All printing for the user happens here.

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PrepareArgs, TrainQaArgs, TrainTaggerArgs};

use crate::data::squad::PreparationReport;
use crate::ml::trainer::TrainingSummary;

#[derive(Parser, Debug)]
#[command(
    name = "bert-span-align",
    version,
    about = "Encode token-tagging and span-QA corpora for a BERT-style encoder and train on them."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::PrepareQa(args) => run_prepare(args),
            Commands::TrainTagger(args) => run_train_tagger(args),
            Commands::TrainQa(args) => run_train_qa(args),
        }
    }
}

fn run_prepare(args: PrepareArgs) -> Result<()> {
    use crate::application::prepare_use_case::PrepareQaUseCase;

    let prepared = PrepareQaUseCase::new(args.into()).execute()?;
    print_report("train", &prepared.train.report);
    if let Some(eval) = &prepared.eval {
        print_report("eval", &eval.report);
    }
    Ok(())
}

fn print_report(kind: &str, report: &PreparationReport) {
    for line in report_lines(kind, report) {
        println!("{line}");
    }
}

fn report_lines(kind: &str, report: &PreparationReport) -> Vec<String> {
    std::iter::once(format!("{kind}: {report}"))
        .chain(
            report
                .skip_reasons
                .iter()
                .map(|(reason, count)| format!("  skipped {count} × {reason}")),
        )
        .collect()
}

fn run_train_tagger(args: TrainTaggerArgs) -> Result<()> {
    use crate::application::tagging_use_case::TrainTaggerUseCase;

    tracing::info!("Training tagger on '{}'", args.data_file);
    let artifact_dir = args.artifact_dir.clone();
    let summary = TrainTaggerUseCase::new(args.into()).execute()?;
    print_summary(&summary, &artifact_dir);
    Ok(())
}

fn run_train_qa(args: TrainQaArgs) -> Result<()> {
    use crate::application::qa_use_case::TrainQaUseCase;

    tracing::info!("Training QA model on '{}'", args.prepare.train_file);
    let artifact_dir = args.artifact_dir.clone();
    let summary = TrainQaUseCase::new(args.into()).execute()?;
    print_summary(&summary, &artifact_dir);
    Ok(())
}

fn print_summary(summary: &TrainingSummary, artifact_dir: &str) {
    match summary.best {
        Some(best) => println!(
            "Training complete after {} epochs. Best epoch {} (valid_loss={:.4}, {} parameters) saved in '{}'.",
            summary.epochs,
            best.epoch,
            best.valid_loss,
            summary.restored_params.unwrap_or_default(),
            artifact_dir
        ),
        None => println!(
            "Training complete after {} epochs; no checkpoint was saved.",
            summary.epochs
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_lines_list_every_skip_reason() {
        let mut report = PreparationReport::default();
        report.skip_reasons.insert("invalid_answer".to_string(), 2);
        report.skip_reasons.insert("missing_answers".to_string(), 1);

        let lines = report_lines("eval", &report);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("eval: "));
        assert_eq!(lines[1], "  skipped 2 × invalid_answer");
        assert_eq!(lines[2], "  skipped 1 × missing_answers");
    }
}
