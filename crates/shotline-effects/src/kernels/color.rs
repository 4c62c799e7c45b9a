//! Per-pixel colour kernels expressed as colour matrices.

use shotline_core::{EffectCategory, EffectParameter, KernelKind, ParamValue, ParamValues};
use shotline_gpu::ShaderComplexity;

use crate::kernel::{param_f64, ColorMatrix, EffectKernel, StageDesc, StageOp};

#[rustfmt::skip]
pub const IDENTITY: ColorMatrix = [
    1.0, 0.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0, 0.0,
    0.0, 0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.0, 1.0, 0.0,
];

#[rustfmt::skip]
const SEPIA: ColorMatrix = [
    0.393, 0.769, 0.189, 0.0, 0.0,
    0.349, 0.686, 0.168, 0.0, 0.0,
    0.272, 0.534, 0.131, 0.0, 0.0,
    0.0,   0.0,   0.0,   1.0, 0.0,
];

#[rustfmt::skip]
const INVERT: ColorMatrix = [
    -1.0,  0.0,  0.0, 0.0, 1.0,
     0.0, -1.0,  0.0, 0.0, 1.0,
     0.0,  0.0, -1.0, 0.0, 1.0,
     0.0,  0.0,  0.0, 1.0, 0.0,
];

/// Approximate luma weights used by the low-complexity variants.
pub const LUMA_SIMPLE: [f32; 3] = [0.3, 0.59, 0.11];
/// Rec. 709 luma weights.
pub const LUMA_REC709: [f32; 3] = [0.2126, 0.7152, 0.0722];

pub fn luma_for(complexity: ShaderComplexity) -> [f32; 3] {
    match complexity {
        ShaderComplexity::Low => LUMA_SIMPLE,
        ShaderComplexity::Medium | ShaderComplexity::High => LUMA_REC709,
    }
}

/// Element-wise blend of two matrices.
pub fn mix(a: &ColorMatrix, b: &ColorMatrix, t: f32) -> ColorMatrix {
    let mut out = [0.0; 20];
    for (o, (x, y)) in out.iter_mut().zip(a.iter().zip(b.iter())) {
        *o = x + (y - x) * t;
    }
    out
}

/// Matrix that applies `first`, then `second`.
pub fn compose(first: &ColorMatrix, second: &ColorMatrix) -> ColorMatrix {
    let mut out = [0.0; 20];
    for row in 0..4 {
        for col in 0..5 {
            let mut v: f32 = (0..4).map(|k| second[row * 5 + k] * first[k * 5 + col]).sum();
            if col == 4 {
                v += second[row * 5 + 4];
            }
            out[row * 5 + col] = v;
        }
    }
    out
}

pub fn brightness(amount: f32) -> ColorMatrix {
    let mut m = IDENTITY;
    m[4] = amount;
    m[9] = amount;
    m[14] = amount;
    m
}

pub fn contrast(amount: f32) -> ColorMatrix {
    let offset = 0.5 * (1.0 - amount);
    let mut m = IDENTITY;
    for c in 0..3 {
        m[c * 5 + c] = amount;
        m[c * 5 + 4] = offset;
    }
    m
}

pub fn saturation(amount: f32, luma: [f32; 3]) -> ColorMatrix {
    let inv = 1.0 - amount;
    let mut m = IDENTITY;
    for row in 0..3 {
        for col in 0..3 {
            m[row * 5 + col] = luma[col] * inv + if row == col { amount } else { 0.0 };
        }
    }
    m
}

fn range(value: f64, min: f64, max: f64) -> ParamValue {
    ParamValue::Range { value, min, max }
}

fn matrix_stage(kind: KernelKind, m: ColorMatrix, complexity: ShaderComplexity) -> StageDesc {
    StageDesc::new(kind.id(), StageOp::ColorMatrix(m), complexity)
}

pub struct Brightness;

impl EffectKernel for Brightness {
    fn kind(&self) -> KernelKind {
        KernelKind::Brightness
    }

    fn name(&self) -> &str {
        "Brightness"
    }

    fn category(&self) -> EffectCategory {
        EffectCategory::Color
    }

    fn parameters(&self) -> Vec<EffectParameter> {
        vec![EffectParameter::new("amount", range(0.0, -1.0, 1.0))]
    }

    fn stage(&self, params: &ParamValues, complexity: ShaderComplexity) -> StageDesc {
        let amount = param_f64(params, "amount", 0.0) as f32;
        matrix_stage(self.kind(), brightness(amount), complexity)
    }
}

pub struct Contrast;

impl EffectKernel for Contrast {
    fn kind(&self) -> KernelKind {
        KernelKind::Contrast
    }

    fn name(&self) -> &str {
        "Contrast"
    }

    fn category(&self) -> EffectCategory {
        EffectCategory::Color
    }

    fn parameters(&self) -> Vec<EffectParameter> {
        vec![EffectParameter::new("amount", range(1.0, 0.0, 3.0))]
    }

    fn stage(&self, params: &ParamValues, complexity: ShaderComplexity) -> StageDesc {
        let amount = param_f64(params, "amount", 1.0) as f32;
        matrix_stage(self.kind(), contrast(amount), complexity)
    }
}

pub struct Saturation;

impl EffectKernel for Saturation {
    fn kind(&self) -> KernelKind {
        KernelKind::Saturation
    }

    fn name(&self) -> &str {
        "Saturation"
    }

    fn category(&self) -> EffectCategory {
        EffectCategory::Color
    }

    fn parameters(&self) -> Vec<EffectParameter> {
        vec![EffectParameter::new("amount", range(1.0, 0.0, 3.0))]
    }

    fn stage(&self, params: &ParamValues, complexity: ShaderComplexity) -> StageDesc {
        let amount = param_f64(params, "amount", 1.0) as f32;
        matrix_stage(self.kind(), saturation(amount, luma_for(complexity)), complexity)
    }
}

pub struct Grayscale;

impl EffectKernel for Grayscale {
    fn kind(&self) -> KernelKind {
        KernelKind::Grayscale
    }

    fn name(&self) -> &str {
        "Grayscale"
    }

    fn category(&self) -> EffectCategory {
        EffectCategory::Color
    }

    fn parameters(&self) -> Vec<EffectParameter> {
        vec![EffectParameter::new("amount", range(1.0, 0.0, 1.0))]
    }

    fn stage(&self, params: &ParamValues, complexity: ShaderComplexity) -> StageDesc {
        let amount = param_f64(params, "amount", 1.0) as f32;
        matrix_stage(
            self.kind(),
            saturation(1.0 - amount, luma_for(complexity)),
            complexity,
        )
    }
}

pub struct Sepia;

impl EffectKernel for Sepia {
    fn kind(&self) -> KernelKind {
        KernelKind::Sepia
    }

    fn name(&self) -> &str {
        "Sepia"
    }

    fn category(&self) -> EffectCategory {
        EffectCategory::Stylize
    }

    fn parameters(&self) -> Vec<EffectParameter> {
        vec![EffectParameter::new("amount", range(1.0, 0.0, 1.0))]
    }

    fn stage(&self, params: &ParamValues, complexity: ShaderComplexity) -> StageDesc {
        let amount = param_f64(params, "amount", 1.0) as f32;
        matrix_stage(self.kind(), mix(&IDENTITY, &SEPIA, amount), complexity)
    }
}

/// Faded warm film look: partial sepia, lowered contrast, warm offset.
pub struct Vintage;

impl EffectKernel for Vintage {
    fn kind(&self) -> KernelKind {
        KernelKind::Vintage
    }

    fn name(&self) -> &str {
        "Vintage"
    }

    fn category(&self) -> EffectCategory {
        EffectCategory::Stylize
    }

    fn parameters(&self) -> Vec<EffectParameter> {
        vec![EffectParameter::new("amount", range(0.6, 0.0, 1.0))]
    }

    fn stage(&self, params: &ParamValues, complexity: ShaderComplexity) -> StageDesc {
        let amount = param_f64(params, "amount", 0.6) as f32;
        let toned = mix(&IDENTITY, &SEPIA, amount * 0.6);
        let mut faded = contrast(1.0 - 0.15 * amount);
        faded[4] += 0.05 * amount;
        faded[14] -= 0.05 * amount;
        matrix_stage(self.kind(), compose(&toned, &faded), complexity)
    }
}

pub struct Invert;

impl EffectKernel for Invert {
    fn kind(&self) -> KernelKind {
        KernelKind::Invert
    }

    fn name(&self) -> &str {
        "Invert"
    }

    fn category(&self) -> EffectCategory {
        EffectCategory::Color
    }

    fn parameters(&self) -> Vec<EffectParameter> {
        vec![EffectParameter::new("amount", range(1.0, 0.0, 1.0))]
    }

    fn stage(&self, params: &ParamValues, complexity: ShaderComplexity) -> StageDesc {
        let amount = param_f64(params, "amount", 1.0) as f32;
        matrix_stage(self.kind(), mix(&IDENTITY, &INVERT, amount), complexity)
    }
}
