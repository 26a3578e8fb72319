//! CPU profile capture spanning a whole load run, written as a flamegraph SVG.

use std::path::{Path, PathBuf};

use crate::error::LoadError;

#[cfg(feature = "cpu-profile")]
pub struct CpuProfile {
    guard: pprof::ProfilerGuard<'static>,
    path: PathBuf,
}

#[cfg(feature = "cpu-profile")]
impl CpuProfile {
    const FREQUENCY_HZ: i32 = 999;

    pub fn start(path: &Path) -> Result<Self, LoadError> {
        let guard = pprof::ProfilerGuardBuilder::default()
            .frequency(Self::FREQUENCY_HZ)
            .blocklist(&["libc", "libgcc", "pthread", "vdso"])
            .build()
            .map_err(|e| LoadError::Profile(e.to_string()))?;
        Ok(Self {
            guard,
            path: path.to_owned(),
        })
    }

    /// Stops sampling and writes the flamegraph.
    pub fn finish(self) -> Result<PathBuf, LoadError> {
        let report = self
            .guard
            .report()
            .build()
            .map_err(|e| LoadError::Profile(e.to_string()))?;
        let file = std::fs::File::create(&self.path)?;
        report
            .flamegraph(file)
            .map_err(|e| LoadError::Profile(e.to_string()))?;
        Ok(self.path)
    }
}

#[cfg(not(feature = "cpu-profile"))]
pub struct CpuProfile {
    path: PathBuf,
}

#[cfg(not(feature = "cpu-profile"))]
impl CpuProfile {
    pub fn start(path: &Path) -> Result<Self, LoadError> {
        let _ = path;
        Err(LoadError::Profile(
            "built without the cpu-profile feature".into(),
        ))
    }

    pub fn finish(self) -> Result<PathBuf, LoadError> {
        Ok(self.path)
    }
}
