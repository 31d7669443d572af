//! Vision analyzers
//!
//! One capability, two protocols: a single-shot chat completion with an
//! inline base64 image, or the stateful assistants file/thread/run protocol
//! with bounded run-status polling. Both return the model's free-text reply,
//! which is expected to contain a JSON array of garment objects.

mod assistant;
mod chat;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::error::ServiceResult;

pub use assistant::OpenAiAssistantAnalyzer;
pub use chat::OpenAiChatAnalyzer;

/// Instruction sent with every clothing photo. Demands a bare JSON array,
/// one object per detected garment.
pub(crate) const GARMENT_PROMPT: &str = "\
You are a fashion expert AI. Analyze the clothing visible in the provided image \
and return ONLY a JSON array with one object per detected garment.

Each object must contain:
- \"type\": the garment type (e.g. t-shirt, jeans, jacket, shoes...)
- \"color\": the dominant color
- \"style\": the approximate style (casual, streetwear, chic, sport, etc.)
- \"brand\": the detected brand, or \"unknown\"
- \"suggestedBrands\": an array of 3 similar brands

Important:
- If several garments are present, detect them all
- Return NO text outside the JSON
- Reply strictly as a JSON array";

/// Vision analyzer abstraction: image bytes in, free-text model reply out.
#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        image: Bytes,
        content_type: &str,
        cancel: &CancellationToken,
    ) -> ServiceResult<String>;
}
