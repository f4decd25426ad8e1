//! Side-by-side comparison of the original preview and the generated image.

pub const LOADING_CAPTION: &str = "Generating your pup's transformation...";
pub const ORIGINAL_LABEL: &str = "Original Photo";
pub const GENERATED_LABEL: &str = "AI Transformation";

/// What a presenter is asked to draw. Holds display references only; the
/// presenter never owns or releases the preview behind `original`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonView {
    pub original: String,
    pub generated: String,
    pub is_loading: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Panel {
    Loading { caption: &'static str },
    Image { label: &'static str, source: String },
}

impl ComparisonView {
    pub fn new(
        original: impl Into<String>,
        generated: impl Into<String>,
        is_loading: bool,
    ) -> Self {
        Self {
            original: original.into(),
            generated: generated.into(),
            is_loading,
        }
    }

    pub fn panels(&self) -> Vec<Panel> {
        if self.is_loading {
            return vec![Panel::Loading {
                caption: LOADING_CAPTION,
            }];
        }

        vec![
            Panel::Image {
                label: ORIGINAL_LABEL,
                source: self.original.clone(),
            },
            Panel::Image {
                label: GENERATED_LABEL,
                source: self.generated.clone(),
            },
        ]
    }
}

pub trait ResultPresenter {
    fn render(&mut self, view: &ComparisonView);
}
