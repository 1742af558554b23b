//! Boundaries to the external services the design pipeline consumes.
//!
//! Each capability is a trait object so the Gemini-backed client can be swapped
//! for deterministic fakes in tests.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::CapabilityError;
use crate::models::{Finger, StyleHint};

/// Reply of an image synthesis call. A successful call can still come back
/// without an image; callers decide whether that is fatal.
#[derive(Debug, Clone, Default)]
pub struct ImageReply {
    pub image_ref: Option<String>,
    pub texts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReasoningRequest {
    pub instructions: String,
    pub prompt: String,
}

#[async_trait]
pub trait VisionCapability: Send + Sync {
    /// Returns the raw JSON text describing one nail.
    async fn measure(&self, image: &Bytes, finger: &Finger) -> Result<String, CapabilityError>;
}

#[async_trait]
pub trait SynthesisCapability: Send + Sync {
    async fn synthesize(&self, prompt: &str, hint: StyleHint) -> Result<ImageReply, CapabilityError>;
}

#[async_trait]
pub trait ReasoningCapability: Send + Sync {
    /// Returns the raw text of a JSON object.
    async fn reason(&self, request: &ReasoningRequest) -> Result<String, CapabilityError>;
}

#[cfg(test)]
pub mod fakes {
    use super::*;
    use crate::error::Capability;
    use parking_lot::Mutex;

    /// Synthesis fake that fails any prompt containing `fail_marker`.
    #[derive(Default)]
    pub struct FakeSynthesis {
        pub fail_marker: Option<String>,
        pub calls: Mutex<Vec<(String, StyleHint)>>,
    }

    impl FakeSynthesis {
        pub fn failing_on(marker: &str) -> Self {
            Self { fail_marker: Some(marker.to_string()), ..Default::default() }
        }
    }

    #[async_trait]
    impl SynthesisCapability for FakeSynthesis {
        async fn synthesize(&self, prompt: &str, hint: StyleHint) -> Result<ImageReply, CapabilityError> {
            let n = {
                let mut calls = self.calls.lock();
                calls.push((prompt.to_string(), hint));
                calls.len()
            };
            if let Some(marker) = &self.fail_marker {
                if prompt.contains(marker.as_str()) {
                    return Err(CapabilityError::Upstream {
                        capability: Capability::Synthesis,
                        message: "upstream exploded".into(),
                    });
                }
            }
            Ok(ImageReply { image_ref: Some(format!("fake://design/{n}")), texts: vec![] })
        }
    }

    /// Synthesis fake that answers successfully but without an image.
    pub struct EmptySynthesis;

    #[async_trait]
    impl SynthesisCapability for EmptySynthesis {
        async fn synthesize(&self, _prompt: &str, _hint: StyleHint) -> Result<ImageReply, CapabilityError> {
            Ok(ImageReply { image_ref: None, texts: vec!["I can't draw that".into()] })
        }
    }

    pub struct FakeReasoning {
        pub reply: Result<String, CapabilityError>,
        pub requests: Mutex<Vec<ReasoningRequest>>,
    }

    impl FakeReasoning {
        pub fn replying(text: &str) -> Self {
            Self { reply: Ok(text.to_string()), requests: Mutex::new(Vec::new()) }
        }

        pub fn failing() -> Self {
            Self {
                reply: Err(CapabilityError::Timeout {
                    capability: Capability::Reasoning,
                    message: "deadline elapsed".into(),
                }),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ReasoningCapability for FakeReasoning {
        async fn reason(&self, request: &ReasoningRequest) -> Result<String, CapabilityError> {
            self.requests.lock().push(request.clone());
            self.reply.clone()
        }
    }

    type VisionResponder = Box<dyn Fn(&Finger) -> Result<String, CapabilityError> + Send + Sync>;

    pub struct FakeVision {
        respond: VisionResponder,
    }

    impl FakeVision {
        pub fn new(respond: impl Fn(&Finger) -> Result<String, CapabilityError> + Send + Sync + 'static) -> Self {
            Self { respond: Box::new(respond) }
        }
    }

    #[async_trait]
    impl VisionCapability for FakeVision {
        async fn measure(&self, _image: &Bytes, finger: &Finger) -> Result<String, CapabilityError> {
            (self.respond)(finger)
        }
    }
}
