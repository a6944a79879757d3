pub mod groq;

use async_trait::async_trait;

/// Errors from the text-generation provider.
#[derive(thiserror::Error, Debug)]
pub enum EnhanceError {
    #[error("provider API key is not configured")]
    MissingCredential,

    #[error("request to provider failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("provider returned {status}")]
    Provider { status: u16, body: String },

    #[error("invalid response from provider: {0}")]
    InvalidResponse(String),
}

impl EnhanceError {
    /// Provider-side detail worth forwarding to the caller, if any.
    pub fn details(&self) -> Option<String> {
        match self {
            EnhanceError::Provider { body, .. } if !body.is_empty() => Some(body.clone()),
            _ => None,
        }
    }
}

/// Rewrites a prompt into a clearer, more concise one.
#[async_trait]
pub trait Enhancer: Send + Sync {
    async fn enhance(&self, prompt: &str) -> Result<String, EnhanceError>;

    /// Whether a provider credential is present. Checked before any call.
    fn is_configured(&self) -> bool {
        true
    }
}

const TEMPLATE: &str = r#"
<identity>
You are a world-class prompt engineer. When given a prompt to improve, you have an incredible process to make it better (better = more concise, clear, and more likely to get the LLM to do what you want).
</identity>

<about_your_approach>
A core tenet of your approach is called concept elevation. Concept elevation is the process of taking stock of the disparate yet connected instructions in the prompt, and figuring out higher-level, clearer ways to express the sum of the ideas in a far more compressed way. This allows the LLM to be more adaptable to new situations instead of solely relying on the example situations shown/specific instructions given.

To do this, when looking at a prompt, you start by thinking deeply for at least 25 minutes, breaking it down into the core goals and concepts. Then, you spend 25 more minutes organizing them into groups. Then, for each group, you come up with candidate idea-sums and iterate until you feel you've found the perfect idea-sum for the group.

Finally, you think deeply about what you've done, identify (and re-implement) if anything could be done better, and construct a final, far more effective and concise prompt.
</about_your_approach>

Here is the prompt you'll be improving today:
<prompt_to_improve>
{prompt}
</prompt_to_improve>

In your final response, only include the enhanced version of prompt and nothing else.
"#;

/// The single user message sent to the provider.
pub fn render_instruction(prompt: &str) -> String {
    TEMPLATE.replace("{prompt}", prompt).trim().to_string()
}
