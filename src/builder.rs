use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};

use crate::{
    Config, Engine, Result,
    secrets::{Base64Cipher, CredentialCipher},
};

/// Builds an [`Engine`], optionally sharing an existing runtime or
/// swapping the credential codec.
#[derive(Default)]
pub struct EngineBuilder {
    config: Config,
    runtime: Option<Arc<Runtime>>,
    cipher: Option<Arc<dyn CredentialCipher>>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(
        mut self,
        config: Config,
    ) -> Self {
        self.config = config;
        self
    }

    pub fn runtime(
        mut self,
        runtime: Arc<Runtime>,
    ) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn cipher(
        mut self,
        cipher: Arc<dyn CredentialCipher>,
    ) -> Self {
        self.cipher = Some(cipher);
        self
    }

    pub fn build(self) -> Result<Engine> {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Arc::new(
                Builder::new_multi_thread().worker_threads(self.config.async_worker_thread_number.into()).enable_all().build().unwrap(),
            ),
        };
        let cipher = self.cipher.unwrap_or_else(|| Arc::new(Base64Cipher));

        Ok(Engine::new(self.config, runtime, cipher))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_with_defaults() {
        let engine = EngineBuilder::new().build().unwrap();
        engine.launch();
        engine.shutdown();
    }

    #[test]
    fn test_build_with_shared_runtime() {
        let runtime = Arc::new(Builder::new_multi_thread().worker_threads(2).enable_all().build().unwrap());
        let engine = EngineBuilder::new().config(Config::default()).runtime(runtime).build().unwrap();
        engine.launch();
        engine.shutdown();
    }
}
