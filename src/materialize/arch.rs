use crate::error::{Error, Result};
use std::fmt;

/// Docker platform architecture for project images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    Amd64,
    Arm64,
}

impl Arch {
    /// Architecture of the machine running turbine.
    pub fn detect() -> Result<Self> {
        Self::from_target(std::env::consts::ARCH)
    }

    /// Map a Rust target architecture name to a Docker platform.
    pub fn from_target(target: &str) -> Result<Self> {
        match target {
            "x86_64" => Ok(Arch::Amd64),
            "aarch64" | "arm64" => Ok(Arch::Arm64),
            other => Err(Error::Config(format!(
                "Unsupported architecture '{}' (expected x86_64 or aarch64)",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "arm64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_target() {
        assert_eq!(Arch::from_target("x86_64").unwrap(), Arch::Amd64);
        assert_eq!(Arch::from_target("aarch64").unwrap(), Arch::Arm64);
        assert!(matches!(Arch::from_target("riscv64"), Err(Error::Config(_))));
    }
}
