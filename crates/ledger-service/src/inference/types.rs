//! Analysis request/report types and chat-completion wire types.

use serde::{Deserialize, Serialize};

/// The priced analyses the platform offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    /// Valuation of a business from its financials.
    Business,
    /// Review of a company website.
    Website,
    /// Summary of uploaded documents (text already extracted).
    Document,
}

impl AnalysisKind {
    /// Feature name used for pricing and in CONSUME records.
    #[must_use]
    pub const fn feature_name(&self) -> &'static str {
        match self {
            Self::Business => "business_analysis",
            Self::Website => "website_analysis",
            Self::Document => "document_analysis",
        }
    }

    /// Instructions sent ahead of the caller's input.
    #[must_use]
    pub const fn instructions(&self) -> &'static str {
        match self {
            Self::Business => {
                "You are an expert in business valuation and in preparing companies for sale. \
                 Analyse the company data below and produce a valuation report as a JSON object with \
                 the keys: valuation {minimum, optimal, maximum, method, rationale}, strengths, \
                 improvements, financial_analysis, market_position, risks, sale_recommendations, \
                 sale_timeline and attractiveness_score (0-100)."
            }
            Self::Website => {
                "You are an expert in digital due diligence. Assess the website described below \
                 and produce a JSON object with the keys: summary, audience, strengths, weaknesses, \
                 seo, conversion, risks, recommendations and score (0-100)."
            }
            Self::Document => {
                "You are an M&A analyst. Read the document excerpts below and produce a JSON object \
                 with the keys: summary, key_figures, strengths, risks, missing_information and \
                 recommendations."
            }
        }
    }
}

impl std::fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Business => "business",
            Self::Website => "website",
            Self::Document => "document",
        })
    }
}

/// Input for one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Which analysis to run.
    pub kind: AnalysisKind,
    /// Free-form input (form fields, URL, extracted text).
    pub input: serde_json::Value,
}

impl AnalysisRequest {
    /// Full prompt for the model.
    #[must_use]
    pub fn prompt(&self) -> String {
        let input = serde_json::to_string_pretty(&self.input).unwrap_or_default();
        format!(
            "{}\n\nInput:\n{input}\n\nAnswer with the JSON object only, without any other text.",
            self.kind.instructions()
        )
    }
}

/// The result of an analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Which analysis ran.
    pub kind: AnalysisKind,
    /// Model that produced the result.
    pub model: String,
    /// Whether the fallback model was used.
    pub fallback_used: bool,
    /// Parsed model output. Output that is not JSON is wrapped as `{"text": ...}`.
    pub result: serde_json::Value,
}

// ============================================================================
// Chat completion wire types
// ============================================================================

/// A chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role (`user`, `assistant`, `system`).
    pub role: String,
    /// Message text.
    pub content: String,
}

/// Chat completion request body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest<'a> {
    /// Model identifier.
    pub model: &'a str,
    /// Conversation.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Output cap.
    pub max_tokens: u32,
}

/// Chat completion response body.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    /// Completions; the first one is used.
    pub choices: Vec<ChatChoice>,
}

/// One completion.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    /// The generated message.
    pub message: ChatMessage,
}
