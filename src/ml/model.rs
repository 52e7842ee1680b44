use std::{fmt, str::FromStr};

use burn::{
    nn::{
        attention::{generate_autoregressive_mask, MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
        PositionalEncoding as SinusoidalEncoding, PositionalEncodingConfig,
    },
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::domain::error::TrainError;

// ─── Model contract used by the training loop ────────────────────────────────
/// A sequence model: token ids [batch, seq] → logits [batch, seq, n_vocab].
pub trait SequenceModel<B: Backend> {
    fn logits(&self, input: Tensor<B, 2, Int>) -> Tensor<B, 3>;

    /// Parameters outside the embedding and unembedding tables.
    fn n_parameters(&self) -> usize;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionalEncodingKind {
    #[default]
    None,
    Sin,
    Learned,
}

impl FromStr for PositionalEncodingKind {
    type Err = TrainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none"                => Ok(Self::None),
            "sin" | "sinusoidal"  => Ok(Self::Sin),
            "learned"             => Ok(Self::Learned),
            other => Err(TrainError::config(format!(
                "unknown positional encoding '{other}' (expected none, sin or learned)"
            ))),
        }
    }
}

impl fmt::Display for PositionalEncodingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None    => "none",
            Self::Sin     => "sin",
            Self::Learned => "learned",
        };
        f.write_str(name)
    }
}

#[derive(Config, Debug)]
pub struct TransformerConfig {
    pub n_layer:    usize,
    pub d_model:    usize,
    pub d_head:     usize,
    pub n_ctx:      usize,
    pub n_vocab:    usize,
    pub positional: PositionalEncodingKind,
    /// Causal self-attention (autoregressive objective)
    pub causal:     bool,
}

impl TransformerConfig {
    pub fn n_heads(&self) -> usize {
        self.d_model / self.d_head
    }

    pub fn d_mlp(&self) -> usize {
        4 * self.d_model
    }

    /// 4·d² for attention plus 8·d² for the MLP, per layer.
    pub fn n_parameters(&self) -> usize {
        self.n_layer * 12 * self.d_model * self.d_model
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Transformer<B> {
        let token_embedding = EmbeddingConfig::new(self.n_vocab, self.d_model).init(device);

        let learned_position = matches!(self.positional, PositionalEncodingKind::Learned)
            .then(|| EmbeddingConfig::new(self.n_ctx, self.d_model).init(device));
        let sinusoidal_position = matches!(self.positional, PositionalEncodingKind::Sin).then(|| {
            PositionalEncodingConfig::new(self.d_model)
                .with_max_sequence_size(self.n_ctx)
                .init(device)
        });

        let blocks = (0..self.n_layer).map(|_| self.build_block(device)).collect();

        Transformer {
            token_embedding,
            learned_position,
            sinusoidal_position,
            blocks,
            final_norm: LayerNormConfig::new(self.d_model).init(device),
            unembed:    LinearConfig::new(self.d_model, self.n_vocab).init(device),
            causal:     self.causal,
            n_parameters: self.n_parameters(),
        }
    }

    fn build_block<B: Backend>(&self, device: &B::Device) -> Block<B> {
        Block {
            attn_norm: LayerNormConfig::new(self.d_model).init(device),
            attention: MultiHeadAttentionConfig::new(self.d_model, self.n_heads())
                .with_dropout(0.0)
                .init(device),
            mlp_norm:  LayerNormConfig::new(self.d_model).init(device),
            mlp_in:    LinearConfig::new(self.d_model, self.d_mlp()).init(device),
            mlp_out:   LinearConfig::new(self.d_mlp(), self.d_model).init(device),
        }
    }
}

/// Pre-norm residual block: attention then GELU MLP.
#[derive(Module, Debug)]
pub struct Block<B: Backend> {
    pub attn_norm: LayerNorm<B>,
    pub attention: MultiHeadAttention<B>,
    pub mlp_norm:  LayerNorm<B>,
    pub mlp_in:    Linear<B>,
    pub mlp_out:   Linear<B>,
}

impl<B: Backend> Block<B> {
    pub fn forward(&self, x: Tensor<B, 3>, mask: Option<Tensor<B, 3, Bool>>) -> Tensor<B, 3> {
        let mut attn_input = MhaInput::self_attn(self.attn_norm.forward(x.clone()));
        if let Some(mask) = mask {
            attn_input = attn_input.mask_attn(mask);
        }
        let x = x + self.attention.forward(attn_input).context;

        let h = burn::tensor::activation::gelu(self.mlp_in.forward(self.mlp_norm.forward(x.clone())));
        x + self.mlp_out.forward(h)
    }
}

#[derive(Module, Debug)]
pub struct Transformer<B: Backend> {
    pub token_embedding:     Embedding<B>,
    pub learned_position:    Option<Embedding<B>>,
    pub sinusoidal_position: Option<SinusoidalEncoding<B>>,
    pub blocks:              Vec<Block<B>>,
    pub final_norm:          LayerNorm<B>,
    pub unembed:             Linear<B>,
    pub causal:              bool,
    pub n_parameters:        usize,
}

impl<B: Backend> Transformer<B> {
    /// input: [batch, seq] → logits: [batch, seq, n_vocab]
    pub fn forward(&self, input: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = input.dims();
        let device = input.device();

        let mut x = self.token_embedding.forward(input);

        if let Some(position) = &self.learned_position {
            let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
                .unsqueeze::<2>()
                .expand([batch_size, seq_len]);
            x = x + position.forward(positions);
        }
        if let Some(position) = &self.sinusoidal_position {
            x = position.forward(x);
        }

        let mask = self
            .causal
            .then(|| generate_autoregressive_mask::<B>(batch_size, seq_len, &device));

        for block in &self.blocks {
            x = block.forward(x, mask.clone());
        }

        self.unembed.forward(self.final_norm.forward(x))
    }
}

impl<B: Backend> SequenceModel<B> for Transformer<B> {
    fn logits(&self, input: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        self.forward(input)
    }

    fn n_parameters(&self) -> usize {
        self.n_parameters
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    fn tiny(positional: PositionalEncodingKind, causal: bool) -> TransformerConfig {
        TransformerConfig::new(2, 16, 8, 8, 256, positional, causal)
    }

    #[test]
    fn test_logit_shape_for_every_encoding() {
        let device = Default::default();
        for pe in [PositionalEncodingKind::None, PositionalEncodingKind::Sin, PositionalEncodingKind::Learned] {
            let model: Transformer<TestBackend> = tiny(pe, true).init(&device);
            let input = Tensor::<TestBackend, 1, Int>::from_ints([1, 2, 3, 4, 5, 6], &device).reshape([2, 3]);
            assert_eq!(model.forward(input).dims(), [2, 3, 256], "pe={pe}");
        }
    }

    #[test]
    fn test_causal_prefix_is_independent_of_future_tokens() {
        let device = Default::default();
        let model: Transformer<TestBackend> = tiny(PositionalEncodingKind::Learned, true).init(&device);

        let a = Tensor::<TestBackend, 1, Int>::from_ints([5, 6, 7, 8], &device).reshape([1, 4]);
        let b = Tensor::<TestBackend, 1, Int>::from_ints([5, 6, 7, 200], &device).reshape([1, 4]);
        let la = model.forward(a).slice([0..1, 0..3, 0..256]);
        let lb = model.forward(b).slice([0..1, 0..3, 0..256]);

        let diff: f32 = (la - lb).abs().max().into_scalar();
        assert!(diff < 1e-5, "future token leaked into prefix logits: {diff}");
    }

    #[test]
    fn test_non_embedding_parameter_count() {
        let cfg = tiny(PositionalEncodingKind::None, false);
        assert_eq!(cfg.n_heads(), 2);
        assert_eq!(cfg.n_parameters(), 2 * 12 * 16 * 16);
    }

    #[test]
    fn test_parse_positional() {
        assert_eq!("SIN".parse::<PositionalEncodingKind>().unwrap(), PositionalEncodingKind::Sin);
        assert!("rope".parse::<PositionalEncodingKind>().is_err());
    }
}
