//! Effect kernels and the stage descriptions they produce.
//!
//! A kernel turns resolved parameter values into a [`StageDesc`]: the
//! operation, its packed uniforms and the complexity variant it was built
//! for. Stages are validated against the device's uniform capacity before
//! they run, which takes the place of compiling a shader program.

use shotline_core::{
    Effect, EffectCategory, EffectParameter, KernelKind, ParamValues, Result, ShotlineError,
    Transform2D,
};
use shotline_gpu::ShaderComplexity;
use smallvec::SmallVec;

use crate::kernels;

/// Row-major 4×5 colour matrix. Each output channel is the dot product of
/// its row with `[r, g, b, a]` plus the row's fifth element as offset.
pub type ColorMatrix = [f32; 20];

/// Uniform slots of one stage, packed as vec4s.
pub type Uniforms = SmallVec<[[f32; 4]; 8]>;

/// What a stage does to each pixel.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOp {
    ColorMatrix(ColorMatrix),
    /// Square convolution with clamp-to-edge sampling. `weights` has
    /// `size * size` entries, row-major.
    Convolve { size: u32, weights: Vec<f32> },
    /// Affine resample. The transform maps source pixels to destination
    /// pixels; uncovered destination pixels are transparent.
    Transform(Transform2D),
}

/// A validated-on-demand pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageDesc {
    pub label: String,
    pub op: StageOp,
    pub complexity: ShaderComplexity,
}

impl StageDesc {
    pub fn new(label: impl Into<String>, op: StageOp, complexity: ShaderComplexity) -> Self {
        Self {
            label: label.into(),
            op,
            complexity,
        }
    }

    /// Pack the stage's parameters into vec4 uniform slots.
    pub fn uniforms(&self) -> Uniforms {
        let mut out = Uniforms::new();
        match &self.op {
            StageOp::ColorMatrix(m) => {
                for row in m.chunks_exact(5) {
                    out.push([row[0], row[1], row[2], row[3]]);
                }
                out.push([m[4], m[9], m[14], m[19]]);
            }
            StageOp::Convolve { size, weights } => {
                out.push([*size as f32, 0.0, 0.0, 0.0]);
                for chunk in weights.chunks(4) {
                    let mut slot = [0.0; 4];
                    slot[..chunk.len()].copy_from_slice(chunk);
                    out.push(slot);
                }
            }
            StageOp::Transform(t) => {
                let o = t.transform_point(glam::Vec2::ZERO);
                let x = t.transform_point(glam::Vec2::X) - o;
                let y = t.transform_point(glam::Vec2::Y) - o;
                out.push([x.x, x.y, y.x, y.y]);
                out.push([o.x, o.y, 0.0, 0.0]);
            }
        }
        out
    }

    /// Uniform buffer size in bytes.
    pub fn uniform_bytes(&self) -> usize {
        self.uniforms().len() * 16
    }

    /// Check the stage against a device's uniform capacity (in vec4 slots)
    /// and reject non-finite parameters.
    pub fn validate(&self, uniform_capacity: u32) -> Result<()> {
        let uniforms = self.uniforms();
        if uniforms.iter().flatten().any(|v| !v.is_finite()) {
            return Err(ShotlineError::Shader(format!(
                "{}: non-finite uniform value",
                self.label
            )));
        }
        if uniforms.len() > uniform_capacity as usize {
            return Err(ShotlineError::Shader(format!(
                "{}: needs {} uniform vectors, device offers {}",
                self.label,
                uniforms.len(),
                uniform_capacity
            )));
        }
        if let StageOp::Transform(t) = &self.op {
            if t.is_degenerate() {
                return Err(ShotlineError::Shader(format!(
                    "{}: degenerate transform",
                    self.label
                )));
            }
        }
        Ok(())
    }

    /// Program cache key for this stage's kernel variant.
    pub fn program_key(kind: KernelKind, complexity: ShaderComplexity) -> String {
        format!("kernel.{}.{}", kind.id(), complexity.as_str())
    }
}

/// Trait for effect kernels.
pub trait EffectKernel: Send + Sync {
    fn kind(&self) -> KernelKind;

    /// Display name.
    fn name(&self) -> &str;

    fn category(&self) -> EffectCategory;

    /// Parameters with their default values.
    fn parameters(&self) -> Vec<EffectParameter>;

    /// Build the stage for resolved parameter values.
    fn stage(&self, params: &ParamValues, complexity: ShaderComplexity) -> StageDesc;
}

/// Numeric parameter lookup with a fallback for missing or non-numeric
/// values.
pub fn param_f64(params: &ParamValues, name: &str, default: f64) -> f64 {
    params.get(name).and_then(|v| v.as_f64()).unwrap_or(default)
}

/// Built-in kernel registry.
pub struct KernelRegistry {
    kernels: Vec<Box<dyn EffectKernel>>,
}

impl KernelRegistry {
    /// Create a new registry with the built-in kernels.
    pub fn new() -> Self {
        Self {
            kernels: vec![
                Box::new(kernels::Brightness),
                Box::new(kernels::Contrast),
                Box::new(kernels::Saturation),
                Box::new(kernels::Blur),
                Box::new(kernels::Sepia),
                Box::new(kernels::Vintage),
                Box::new(kernels::Grayscale),
                Box::new(kernels::Invert),
                Box::new(kernels::Scale),
                Box::new(kernels::Rotation),
            ],
        }
    }

    /// Register a custom kernel, replacing any kernel of the same kind.
    pub fn register(&mut self, kernel: Box<dyn EffectKernel>) {
        self.kernels.retain(|k| k.kind() != kernel.kind());
        self.kernels.push(kernel);
    }

    pub fn find(&self, kind: KernelKind) -> Option<&dyn EffectKernel> {
        self.kernels
            .iter()
            .find(|k| k.kind() == kind)
            .map(|k| k.as_ref())
    }

    /// Catalog entry for a kernel with default parameters.
    pub fn catalog_effect(&self, kind: KernelKind) -> Option<Effect> {
        self.find(kind).map(|k| Effect {
            id: kind.id().to_string(),
            name: k.name().to_string(),
            category: k.category(),
            kernel: kind,
            parameters: k.parameters(),
        })
    }

    /// Every catalog entry, in registration order.
    pub fn catalog(&self) -> Vec<Effect> {
        self.kernels
            .iter()
            .filter_map(|k| self.catalog_effect(k.kind()))
            .collect()
    }

    /// Build and validate the stage for `kind`.
    pub fn build_stage(
        &self,
        kind: KernelKind,
        params: &ParamValues,
        complexity: ShaderComplexity,
        uniform_capacity: u32,
    ) -> Result<StageDesc> {
        let kernel = self
            .find(kind)
            .ok_or_else(|| ShotlineError::NotFound(format!("kernel {}", kind.id())))?;
        let stage = kernel.stage(params, complexity);
        stage.validate(uniform_capacity)?;
        Ok(stage)
    }
}

impl Default for KernelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
