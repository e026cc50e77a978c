use std::{env, fmt, str::FromStr, sync::OnceLock};

use log::{debug, warn};

use crate::Error;

#[cfg(simd_x86_64)]
cpufeatures::new!(cpuid_avx2, "avx2");

#[cfg(simd_x86_64)]
pub use cpuid_avx2::get as has_avx2;

/// Environment variable that caps the instruction set used by the kernels.
pub const CPU_TARGET_ENV: &str = "INTERP_CPU_TARGET";

/// Instruction set a SAD kernel can be dispatched to.
///
/// `Rust` is the scalar reference and is available everywhere. The other
/// levels are only usable when the crate was built with the `simd` feature
/// for a matching target and the running CPU has the extension.
///
/// Levels order from slowest to fastest within one architecture; comparing
/// an x86 level with `Neon` means nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CpuFeatureLevel {
    /// Portable scalar code.
    Rust,
    /// 16 lanes of `psadbw`. Baseline on every `x86_64` CPU.
    Sse2,
    /// 32 lanes of `vpsadbw`.
    Avx2,
    /// 16 lanes of `vabd` on `aarch64`.
    Neon,
}

impl CpuFeatureLevel {
    /// Every level, from slowest to fastest within each architecture.
    pub const ALL: [CpuFeatureLevel; 4] = [
        CpuFeatureLevel::Rust,
        CpuFeatureLevel::Sse2,
        CpuFeatureLevel::Avx2,
        CpuFeatureLevel::Neon,
    ];

    /// Whether this level can run on the current build and CPU.
    #[must_use]
    #[inline]
    pub fn is_supported(self) -> bool {
        match self {
            CpuFeatureLevel::Rust => true,
            CpuFeatureLevel::Sse2 => cfg!(simd_x86_64),
            CpuFeatureLevel::Avx2 => {
                cfg_if::cfg_if! {
                    if #[cfg(simd_x86_64)] {
                        has_avx2()
                    } else {
                        false
                    }
                }
            }
            CpuFeatureLevel::Neon => cfg!(simd_neon),
        }
    }

    /// The fastest level the hardware supports, ignoring any override.
    #[must_use]
    #[inline]
    pub fn detect_hardware() -> CpuFeatureLevel {
        [
            CpuFeatureLevel::Avx2,
            CpuFeatureLevel::Sse2,
            CpuFeatureLevel::Neon,
        ]
        .into_iter()
        .find(|level| level.is_supported())
        .unwrap_or(CpuFeatureLevel::Rust)
    }

    /// Detects the hardware level and applies the [`CPU_TARGET_ENV`] override.
    ///
    /// The override may only select a level the machine supports. Anything
    /// else is ignored with a warning.
    #[must_use]
    #[inline]
    pub fn detect() -> CpuFeatureLevel {
        let requested = env::var(CPU_TARGET_ENV).ok();
        Self::resolve(Self::detect_hardware(), requested.as_deref())
    }

    fn resolve(hardware: CpuFeatureLevel, requested: Option<&str>) -> CpuFeatureLevel {
        let Some(requested) = requested else {
            return hardware;
        };

        match requested.parse::<CpuFeatureLevel>() {
            Ok(level) if level.is_supported() => {
                debug!("cpu level overridden to {} (hardware: {})", level, hardware);
                level
            }
            Ok(level) => {
                warn!(
                    "{}={} is not supported here, using {}",
                    CPU_TARGET_ENV, level, hardware
                );
                hardware
            }
            Err(e) => {
                warn!("ignoring {}: {}", CPU_TARGET_ENV, e);
                hardware
            }
        }
    }

    /// The process-wide level, detected on first use.
    #[must_use]
    #[inline]
    pub fn get() -> CpuFeatureLevel {
        static LEVEL: OnceLock<CpuFeatureLevel> = OnceLock::new();
        *LEVEL.get_or_init(Self::detect)
    }

    /// Returns `self` if it can run here, otherwise the scalar level.
    #[must_use]
    #[inline]
    pub fn or_scalar(self) -> CpuFeatureLevel {
        if self.is_supported() {
            self
        } else {
            CpuFeatureLevel::Rust
        }
    }

    const fn name(self) -> &'static str {
        match self {
            CpuFeatureLevel::Rust => "rust",
            CpuFeatureLevel::Sse2 => "sse2",
            CpuFeatureLevel::Avx2 => "avx2",
            CpuFeatureLevel::Neon => "neon",
        }
    }
}

impl Default for CpuFeatureLevel {
    #[inline]
    fn default() -> Self {
        Self::get()
    }
}

impl fmt::Display for CpuFeatureLevel {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CpuFeatureLevel {
    type Err = Error;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|level| level.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnknownCpuLevel(s.to_owned()))
    }
}
