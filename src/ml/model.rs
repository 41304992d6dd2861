// ============================================================
// Layer 5 — Models
// ============================================================
// One BERT-style encoder shared by two task heads:
//
//   TransformerEncoder   token + position + segment embeddings,
//                        N post-norm encoder blocks, padding
//                        positions masked out of attention
//
//   TaggingModel         encoder → two per-token classifiers
//                        (POS and entity TAG)
//
//   QaModel              encoder → 2 logits per token, split
//                        into start / end distributions
//
// Losses ignore label 0 for tagging, which is the padding /
// sentinel id the framer writes into both label streams.

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        loss::CrossEntropyLossConfig,
        Dropout, DropoutConfig, Embedding, EmbeddingConfig, LayerNorm, LayerNormConfig, Linear,
        LinearConfig,
    },
    prelude::*,
};

use crate::domain::label_vocab::PAD_LABEL_ID;

/// Segment ids are 0 (first text) or 1 (second text).
const TYPE_VOCAB_SIZE: usize = 2;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct EncoderConfig {
    pub vocab_size: usize,
    pub max_seq_len: usize,
    pub d_model: usize,
    pub num_heads: usize,
    pub num_layers: usize,
    pub d_ff: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
}

impl EncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TransformerEncoder<B> {
        let layers = (0..self.num_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        TransformerEncoder {
            token_embedding: EmbeddingConfig::new(self.vocab_size, self.d_model).init(device),
            position_embedding: EmbeddingConfig::new(self.max_seq_len, self.d_model).init(device),
            segment_embedding: EmbeddingConfig::new(TYPE_VOCAB_SIZE, self.d_model).init(device),
            embedding_norm: LayerNormConfig::new(self.d_model).init(device),
            layers,
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        EncoderBlock {
            self_attn: MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
                .with_dropout(self.dropout)
                .init(device),
            ffn_linear1: LinearConfig::new(self.d_model, self.d_ff).init(device),
            ffn_linear2: LinearConfig::new(self.d_ff, self.d_model).init(device),
            norm1: LayerNormConfig::new(self.d_model).init(device),
            norm2: LayerNormConfig::new(self.d_model).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn: MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1: LayerNorm<B>,
    pub norm2: LayerNorm<B>,
    pub dropout: Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// `pad_mask` is true where the position is padding.
    pub fn forward(&self, x: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn = self
            .self_attn
            .forward(MhaInput::self_attn(x.clone()).mask_pad(pad_mask))
            .context;
        let x = self.norm1.forward(x + self.dropout.forward(attn));
        let ffn_out = self.ffn_linear2.forward(burn::tensor::activation::gelu(
            self.ffn_linear1.forward(x.clone()),
        ));
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

#[derive(Module, Debug)]
pub struct TransformerEncoder<B: Backend> {
    pub token_embedding: Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub segment_embedding: Embedding<B>,
    pub embedding_norm: LayerNorm<B>,
    pub layers: Vec<EncoderBlock<B>>,
    pub dropout: Dropout,
}

impl<B: Backend> TransformerEncoder<B> {
    /// All inputs are [batch, seq_len]; returns [batch, seq_len, d_model].
    pub fn forward(
        &self,
        input_ids: Tensor<B, 2, Int>,
        token_type_ids: Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> Tensor<B, 3> {
        let [batch_size, seq_len] = input_ids.dims();
        let device = input_ids.device();

        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);

        let embedded = self.token_embedding.forward(input_ids)
            + self.position_embedding.forward(positions)
            + self.segment_embedding.forward(token_type_ids);
        let mut x = self.dropout.forward(self.embedding_norm.forward(embedded));

        let pad_mask = attention_mask.equal_elem(0);
        for layer in &self.layers {
            x = layer.forward(x, pad_mask.clone());
        }
        x
    }
}

// ─── Tagging ──────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct TaggingModelConfig {
    pub encoder: EncoderConfig,
    /// Including the reserved padding class 0.
    pub num_pos: usize,
    pub num_tag: usize,
}

impl TaggingModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TaggingModel<B> {
        let d_model = self.encoder.d_model;
        TaggingModel {
            encoder: self.encoder.init(device),
            pos_head: LinearConfig::new(d_model, self.num_pos).init(device),
            tag_head: LinearConfig::new(d_model, self.num_tag).init(device),
            dropout: DropoutConfig::new(self.encoder.dropout).init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct TaggingModel<B: Backend> {
    pub encoder: TransformerEncoder<B>,
    pub pos_head: Linear<B>,
    pub tag_head: Linear<B>,
    pub dropout: Dropout,
}

pub struct TaggingOutput<B: Backend> {
    /// [batch, seq_len, num_pos]
    pub pos_logits: Tensor<B, 3>,
    /// [batch, seq_len, num_tag]
    pub tag_logits: Tensor<B, 3>,
}

impl<B: Backend> TaggingModel<B> {
    pub fn forward(
        &self,
        input_ids: Tensor<B, 2, Int>,
        token_type_ids: Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> TaggingOutput<B> {
        let hidden = self
            .dropout
            .forward(self.encoder.forward(input_ids, token_type_ids, attention_mask));
        TaggingOutput {
            pos_logits: self.pos_head.forward(hidden.clone()),
            tag_logits: self.tag_head.forward(hidden),
        }
    }

    /// (CE_pos + CE_tag) / 2, with label 0 excluded from both.
    pub fn loss(
        &self,
        output: &TaggingOutput<B>,
        target_pos: Tensor<B, 2, Int>,
        target_tag: Tensor<B, 2, Int>,
    ) -> Tensor<B, 1> {
        let pos = token_cross_entropy(output.pos_logits.clone(), target_pos);
        let tag = token_cross_entropy(output.tag_logits.clone(), target_tag);
        (pos + tag) / 2.0_f64
    }
}

/// Cross entropy over every token of a [batch, seq_len, classes]
/// prediction, skipping positions whose target is padding.
fn token_cross_entropy<B: Backend>(logits: Tensor<B, 3>, targets: Tensor<B, 2, Int>) -> Tensor<B, 1> {
    let [batch_size, seq_len, classes] = logits.dims();
    let ce = CrossEntropyLossConfig::new()
        .with_pad_tokens(Some(vec![PAD_LABEL_ID as usize]))
        .init(&logits.device());
    ce.forward(
        logits.reshape([batch_size * seq_len, classes]),
        targets.reshape([batch_size * seq_len]),
    )
}

// ─── QA span head ─────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct QaModelConfig {
    pub encoder: EncoderConfig,
}

impl QaModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> QaModel<B> {
        QaModel {
            encoder: self.encoder.init(device),
            qa_head: LinearConfig::new(self.encoder.d_model, 2).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct QaModel<B: Backend> {
    pub encoder: TransformerEncoder<B>,
    pub qa_head: Linear<B>,
}

pub struct QaOutput<B: Backend> {
    /// [batch, seq_len]
    pub start_logits: Tensor<B, 2>,
    pub end_logits: Tensor<B, 2>,
}

impl<B: Backend> QaModel<B> {
    pub fn forward(
        &self,
        input_ids: Tensor<B, 2, Int>,
        token_type_ids: Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> QaOutput<B> {
        let [batch_size, seq_len] = input_ids.dims();
        let hidden = self.encoder.forward(input_ids, token_type_ids, attention_mask);

        let logits = self.qa_head.forward(hidden); // [batch, seq_len, 2]
        let start_logits = logits
            .clone()
            .slice([0..batch_size, 0..seq_len, 0..1])
            .reshape([batch_size, seq_len]);
        let end_logits = logits
            .slice([0..batch_size, 0..seq_len, 1..2])
            .reshape([batch_size, seq_len]);

        QaOutput {
            start_logits,
            end_logits,
        }
    }

    /// (CE_start + CE_end) / 2. Position 0 ([CLS]) is a valid
    /// target here: it is where unanswerable examples point.
    pub fn loss(
        &self,
        output: &QaOutput<B>,
        start_positions: Tensor<B, 1, Int>,
        end_positions: Tensor<B, 1, Int>,
    ) -> Tensor<B, 1> {
        let ce = CrossEntropyLossConfig::new().init(&output.start_logits.device());
        (ce.forward(output.start_logits.clone(), start_positions)
            + ce.forward(output.end_logits.clone(), end_positions))
            / 2.0_f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn encoder_config() -> EncoderConfig {
        EncoderConfig::new(200, 8, 16, 2, 2, 32).with_dropout(0.0)
    }

    fn inputs(device: &<TestBackend as Backend>::Device) -> [Tensor<TestBackend, 2, Int>; 3] {
        let ids = Tensor::from_ints([[101, 150, 160, 102, 0, 0, 0, 0], [101, 150, 102, 170, 180, 102, 0, 0]], device);
        let types = Tensor::from_ints([[0, 0, 0, 0, 0, 0, 0, 0], [0, 0, 0, 1, 1, 1, 0, 0]], device);
        let mask = Tensor::from_ints([[1, 1, 1, 1, 0, 0, 0, 0], [1, 1, 1, 1, 1, 1, 0, 0]], device);
        [ids, types, mask]
    }

    #[test]
    fn test_encoder_output_shape() {
        let device = Default::default();
        let encoder = encoder_config().init::<TestBackend>(&device);
        let [ids, types, mask] = inputs(&device);
        assert_eq!(encoder.forward(ids, types, mask).dims(), [2, 8, 16]);
    }

    #[test]
    fn test_tagging_heads_and_finite_loss() {
        let device = Default::default();
        let model = TaggingModelConfig::new(encoder_config(), 5, 7).init::<TestBackend>(&device);
        let [ids, types, mask] = inputs(&device);

        let out = model.forward(ids, types, mask);
        assert_eq!(out.pos_logits.dims(), [2, 8, 5]);
        assert_eq!(out.tag_logits.dims(), [2, 8, 7]);

        let pos = Tensor::from_ints([[0, 1, 2, 0, 0, 0, 0, 0], [0, 3, 0, 4, 4, 0, 0, 0]], &device);
        let tag = Tensor::from_ints([[0, 6, 6, 0, 0, 0, 0, 0], [0, 1, 0, 2, 3, 0, 0, 0]], &device);
        let loss: f64 = model.loss(&out, pos, tag).into_scalar().elem::<f64>();
        assert!(loss.is_finite() && loss > 0.0);
    }

    #[test]
    fn test_qa_logits_cover_every_position() {
        let device = Default::default();
        let model = QaModelConfig::new(encoder_config()).init::<TestBackend>(&device);
        let [ids, types, mask] = inputs(&device);

        let out = model.forward(ids, types, mask);
        assert_eq!(out.start_logits.dims(), [2, 8]);
        assert_eq!(out.end_logits.dims(), [2, 8]);

        let starts = Tensor::from_ints([1, 0], &device);
        let ends = Tensor::from_ints([2, 0], &device);
        let loss: f64 = model.loss(&out, starts, ends).into_scalar().elem::<f64>();
        assert!(loss.is_finite());
    }
}
