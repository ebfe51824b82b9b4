use serde::{Deserialize, Serialize};

/// A sentence as laid out on the page. `index` is 0-based reading order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceRef {
    pub id: String,
    pub index: usize,
    pub text: String,
}

/// The UI element under the gaze point, resolved by hit-testing outside the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HoverTarget {
    #[default]
    None,
    Word {
        id: String,
        text: String,
        /// Enclosing sentence, when the layout knows it.
        sentence: Option<SentenceRef>,
    },
    Sentence(SentenceRef),
    /// The open word popup.
    Popup,
}

impl HoverTarget {
    pub fn is_some(&self) -> bool {
        !matches!(self, HoverTarget::None)
    }

    /// The sentence this target belongs to; a word counts for its enclosing sentence.
    pub fn sentence(&self) -> Option<&SentenceRef> {
        match self {
            HoverTarget::Word { sentence, .. } => sentence.as_ref(),
            HoverTarget::Sentence(sentence) => Some(sentence),
            HoverTarget::None | HoverTarget::Popup => None,
        }
    }

    pub fn word(&self) -> Option<(&str, &str)> {
        match self {
            HoverTarget::Word { id, text, .. } => Some((id.as_str(), text.as_str())),
            _ => None,
        }
    }

    pub fn is_popup(&self) -> bool {
        matches!(self, HoverTarget::Popup)
    }
}
