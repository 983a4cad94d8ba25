//! Built-in renderer plugins.
//!
//! Plugins are conditionally compiled based on Cargo feature flags.

use crate::error::Result;
use crate::plugin::{RegistryBuilder, RendererRegistry};

#[cfg(feature = "plugin-trace")]
pub mod trace;

/// Register every compiled-in plugin on `builder`.
pub fn register_builtin(builder: &mut RegistryBuilder) -> Result<()> {
    #[cfg(feature = "plugin-trace")]
    builder.register(Box::new(trace::TracePlugin::new()))?;
    #[cfg(not(feature = "plugin-trace"))]
    let _ = builder;
    Ok(())
}

/// Registry holding only the built-in plugins.
pub fn builtin_registry() -> Result<RendererRegistry> {
    let mut builder = RendererRegistry::builder();
    register_builtin(&mut builder)?;
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_builds() {
        let registry = builtin_registry().unwrap();
        #[cfg(feature = "plugin-trace")]
        assert!(registry.contains("trace"));
        #[cfg(not(feature = "plugin-trace"))]
        assert!(registry.is_empty());
    }

    #[test]
    fn builtin_plugins_register_once() {
        let mut builder = RendererRegistry::builder();
        register_builtin(&mut builder).unwrap();
        #[cfg(feature = "plugin-trace")]
        assert!(register_builtin(&mut builder).is_err());
    }
}
