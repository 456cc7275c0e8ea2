// request/mod.rs — Multimodal generation request builder

mod image;
mod models;

pub use image::{mime_for_path, ImageAttachment, ImageError};
pub use models::{ModelCatalog, ModelProfile};

use serde::Serialize;

pub const DEFAULT_REASONING_BUDGET: u32 = 32_768;

/// One positional item of the request payload
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PayloadPart<'a> {
    Image(&'a ImageAttachment),
    Text(&'a str),
}

/// A fully resolved request; images always precede the instruction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub model: String,
    pub images: Vec<ImageAttachment>,
    pub instruction: String,
    pub temperature: f32,
    pub top_p: Option<f32>,
    pub system_instruction: Option<String>,
    pub reasoning_budget: Option<u32>,
}

impl GenerationRequest {
    /// Payload in send order: every image in upload order, then the instruction
    pub fn payload(&self) -> Vec<PayloadPart<'_>> {
        self.images
            .iter()
            .map(PayloadPart::Image)
            .chain(std::iter::once(PayloadPart::Text(self.instruction.as_str())))
            .collect()
    }

    pub fn without_reasoning(&self) -> Self {
        Self {
            reasoning_budget: None,
            ..self.clone()
        }
    }
}

/// Resolves generation parameters against a model profile
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    reasoning_budget: u32,
    top_p: Option<f32>,
    system_instruction: Option<String>,
}

impl RequestBuilder {
    pub fn new(reasoning_budget: u32) -> Self {
        Self {
            reasoning_budget,
            top_p: None,
            system_instruction: None,
        }
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        let instruction = instruction.into();
        self.system_instruction = if instruction.trim().is_empty() {
            None
        } else {
            Some(instruction)
        };
        self
    }

    /// Capability check is static: the profile decides whether a reasoning
    /// budget is attached at all.
    pub fn build(
        &self,
        images: Vec<ImageAttachment>,
        instruction: impl Into<String>,
        profile: &ModelProfile,
        temperature: f32,
    ) -> GenerationRequest {
        let reasoning_budget = profile
            .supports_extended_reasoning
            .then(|| profile.reasoning_budget(self.reasoning_budget));

        let clamped = clamp_temperature(temperature);
        if clamped != temperature {
            tracing::warn!("Temperature {} out of range, clamped to {}", temperature, clamped);
        }

        tracing::debug!(
            model = %profile.identifier,
            images = images.len(),
            reasoning_budget = ?reasoning_budget,
            "Generation request built"
        );

        GenerationRequest {
            model: profile.identifier.clone(),
            images,
            instruction: instruction.into(),
            temperature: clamped,
            top_p: self.top_p,
            system_instruction: self.system_instruction.clone(),
            reasoning_budget,
        }
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_REASONING_BUDGET)
    }
}

/// Build with the default reasoning budget and no extra parameters
pub fn build(
    images: Vec<ImageAttachment>,
    instruction: impl Into<String>,
    profile: &ModelProfile,
    temperature: f32,
) -> GenerationRequest {
    RequestBuilder::default().build(images, instruction, profile, temperature)
}

pub fn clamp_temperature(temperature: f32) -> f32 {
    if temperature.is_nan() {
        return 0.0;
    }
    temperature.clamp(0.0, 1.0)
}
