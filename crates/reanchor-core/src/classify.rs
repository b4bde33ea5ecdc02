//! Confidence classification shared by both recovery paths.
//!
//! Annotations and connections use different bands but the same three-way
//! outcome. Every threshold comes from [`AnnotationThresholds`] or
//! [`ConnectionThresholds`]; callers never compare against literals.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{AnnotationThresholds, ConnectionThresholds};

/// Outcome bucket for a recovered item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Safe to use without review
    Success,
    /// Plausible, needs human confirmation
    NeedsReview,
    /// Not recoverable with enough confidence
    Lost,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NeedsReview => "needs_review",
            Self::Lost => "lost",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clamp a score into `[0, 1]`, mapping NaN to 0.
pub fn clamp_unit(score: f32) -> f32 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

fn classify_bands(confidence: Option<f32>, success: f32, review: f32) -> Classification {
    match confidence.map(clamp_unit) {
        Some(c) if c >= success => Classification::Success,
        Some(c) if c >= review => Classification::NeedsReview,
        _ => Classification::Lost,
    }
}

/// Classify an annotation match confidence (`None` = no tier matched).
pub fn classify_annotation(
    confidence: Option<f32>,
    thresholds: &AnnotationThresholds,
) -> Classification {
    classify_bands(confidence, thresholds.success, thresholds.review)
}

/// Classify a combined connection similarity (`None` = no candidate).
pub fn classify_connection(
    confidence: Option<f32>,
    thresholds: &ConnectionThresholds,
) -> Classification {
    classify_bands(confidence, thresholds.success, thresholds.review)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_bands() {
        let t = AnnotationThresholds::default();
        assert_eq!(classify_annotation(Some(1.0), &t), Classification::Success);
        assert_eq!(classify_annotation(Some(0.85), &t), Classification::Success);
        assert_eq!(
            classify_annotation(Some(0.849), &t),
            Classification::NeedsReview
        );
        assert_eq!(
            classify_annotation(Some(0.70), &t),
            Classification::NeedsReview
        );
        assert_eq!(classify_annotation(Some(0.699), &t), Classification::Lost);
        assert_eq!(classify_annotation(None, &t), Classification::Lost);
    }

    #[test]
    fn test_connection_bands() {
        let t = ConnectionThresholds::default();
        assert_eq!(classify_connection(Some(1.0), &t), Classification::Success);
        assert_eq!(classify_connection(Some(0.95), &t), Classification::Success);
        assert_eq!(
            classify_connection(Some(0.90), &t),
            Classification::NeedsReview
        );
        assert_eq!(
            classify_connection(Some(0.85), &t),
            Classification::NeedsReview
        );
        assert_eq!(classify_connection(Some(0.80), &t), Classification::Lost);
        assert_eq!(classify_connection(None, &t), Classification::Lost);
    }

    #[test]
    fn test_nan_is_lost() {
        let t = AnnotationThresholds::default();
        assert_eq!(classify_annotation(Some(f32::NAN), &t), Classification::Lost);
    }

    #[test]
    fn test_clamp_unit() {
        assert_eq!(clamp_unit(1.2), 1.0);
        assert_eq!(clamp_unit(-0.3), 0.0);
        assert_eq!(clamp_unit(0.42), 0.42);
        assert_eq!(clamp_unit(f32::NAN), 0.0);
    }

    #[test]
    fn test_classification_display() {
        assert_eq!(Classification::NeedsReview.to_string(), "needs_review");
        let json = serde_json::to_string(&Classification::Lost).unwrap();
        assert_eq!(json, "\"lost\"");
    }
}
