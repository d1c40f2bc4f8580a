//! [`ModelCapability`] backed by a chat-completions endpoint.

use async_trait::async_trait;
use tracing::debug;

use jit_core::{CapabilityResult, ExamplePair, GatedScript, ModelCapability, TestCase};

use crate::client::ChatClient;
use crate::config::LlmConfig;
use crate::error::Result;
use crate::parse::{parse_dockerfile, parse_structured, parse_verdict};
use crate::prompts;

pub struct OpenAiModel {
    client: ChatClient,
}

impl OpenAiModel {
    pub fn new(config: LlmConfig) -> Result<Self> {
        Ok(Self {
            client: ChatClient::new(config)?,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.client.config().model
    }

    async fn ask(&self, operation: &'static str, prompt: String, json_mode: bool) -> Result<String> {
        debug!(operation, prompt_len = prompt.len(), "model request");
        self.client.complete(prompts::SYSTEM, &prompt, json_mode).await
    }

    async fn ask_pair(&self, operation: &'static str, prompt: String) -> CapabilityResult<ExamplePair> {
        let reply = self.ask(operation, prompt, true).await?;
        Ok(parse_structured::<ExamplePair>(&reply)?)
    }
}

#[async_trait]
impl ModelCapability for OpenAiModel {
    async fn generate_dockerfile(&self, script: &GatedScript) -> CapabilityResult<String> {
        let reply = self
            .ask("generate_dockerfile", prompts::generate_dockerfile(script), false)
            .await?;
        Ok(parse_dockerfile(&reply)?)
    }

    async fn repair_dockerfile(
        &self,
        script: &GatedScript,
        previous_dockerfile: &str,
        build_error: &str,
    ) -> CapabilityResult<String> {
        let prompt = prompts::repair_dockerfile(script, previous_dockerfile, build_error);
        let reply = self.ask("repair_dockerfile", prompt, false).await?;
        Ok(parse_dockerfile(&reply)?)
    }

    async fn extract_example(&self, docs: &str) -> CapabilityResult<ExamplePair> {
        self.ask_pair("extract_example", prompts::extract_example(docs)).await
    }

    async fn validate_example(&self, script: &GatedScript, candidate: &TestCase) -> CapabilityResult<bool> {
        let reply = self
            .ask("validate_example", prompts::validate_example(script, candidate), true)
            .await?;
        Ok(parse_verdict(&reply)?)
    }

    async fn synthesize_example(&self, script: &GatedScript) -> CapabilityResult<ExamplePair> {
        self.ask_pair("synthesize_example", prompts::synthesize_example(script))
            .await
    }

    async fn reanalyze_example(
        &self,
        script: &GatedScript,
        actual_output: &str,
        current: &TestCase,
    ) -> CapabilityResult<ExamplePair> {
        self.ask_pair(
            "reanalyze_example",
            prompts::reanalyze_example(script, actual_output, current),
        )
        .await
    }
}
