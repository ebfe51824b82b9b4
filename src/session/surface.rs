use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::ingest::Viewport;
use crate::models::{GazeEvent, HoverTarget, Point, Rect, SentenceRef};

/// The rendered reading view as the gaze pipeline sees it: element geometry for
/// hit-testing, and the UI affordances events are applied to.
pub trait ReaderSurface: Send {
    fn viewport(&self) -> Viewport;

    /// Element under `point`, resolved against the last known layout.
    fn hit_test(&self, point: Point) -> HoverTarget;

    fn popup_visible(&self) -> bool;

    /// Bounding box of the sentence currently on screen, used for synthetic gaze.
    fn visible_sentence_bounds(&self) -> Option<Rect>;

    /// Snapshot of element geometry keyed by element id, for the session report.
    fn element_positions(&self) -> BTreeMap<String, Rect>;

    /// Hands an event to the UI collaborators (popup, grammar help, audio).
    fn apply(&mut self, event: &GazeEvent);
}

pub type SharedSurface = Arc<Mutex<dyn ReaderSurface>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentenceLayout {
    pub id: String,
    pub index: usize,
    pub text: String,
    pub rect: Rect,
}

impl SentenceLayout {
    fn to_sentence_ref(&self) -> SentenceRef {
        SentenceRef {
            id: self.id.clone(),
            index: self.index,
            text: self.text.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordLayout {
    pub id: String,
    pub text: String,
    pub sentence_id: Option<String>,
    pub rect: Rect,
}

/// Popup geometry relative to the word that opened it.
const POPUP_OFFSET_Y: f64 = 8.0;
const POPUP_WIDTH: f64 = 240.0;
const POPUP_HEIGHT: f64 = 120.0;

#[derive(Debug, Clone, PartialEq)]
pub struct OpenPopup {
    pub word_id: String,
    pub word: String,
    pub rect: Rect,
}

/// Last-known element geometry of a reading page plus the word popup state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSnapshot {
    pub viewport: Viewport,
    pub sentences: Vec<SentenceLayout>,
    #[serde(default)]
    pub words: Vec<WordLayout>,
    /// Sentence shown to the reader; defaults to the first one.
    #[serde(default)]
    pub active_sentence_id: Option<String>,
    #[serde(skip)]
    popup: Option<OpenPopup>,
    #[serde(skip)]
    applied: Vec<GazeEvent>,
}

impl LayoutSnapshot {
    pub fn new(viewport: Viewport, sentences: Vec<SentenceLayout>, words: Vec<WordLayout>) -> Self {
        Self {
            viewport,
            sentences,
            words,
            active_sentence_id: None,
            popup: None,
            applied: Vec::new(),
        }
    }

    pub fn popup(&self) -> Option<&OpenPopup> {
        self.popup.as_ref()
    }

    /// Events handed to this surface, oldest first.
    pub fn applied_events(&self) -> &[GazeEvent] {
        &self.applied
    }

    pub fn set_active_sentence(&mut self, sentence_id: impl Into<String>) {
        self.active_sentence_id = Some(sentence_id.into());
    }

    fn sentence(&self, id: &str) -> Option<&SentenceLayout> {
        self.sentences.iter().find(|s| s.id == id)
    }

    fn open_popup(&mut self, word_id: &str, word: &str) {
        let Some(layout) = self.words.iter().find(|w| w.id == word_id) else {
            return;
        };
        let rect = Rect::new(
            layout.rect.x,
            layout.rect.y + layout.rect.height + POPUP_OFFSET_Y,
            POPUP_WIDTH,
            POPUP_HEIGHT,
        );
        self.popup = Some(OpenPopup {
            word_id: word_id.to_string(),
            word: word.to_string(),
            rect,
        });
    }
}

impl ReaderSurface for LayoutSnapshot {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn hit_test(&self, point: Point) -> HoverTarget {
        if let Some(popup) = &self.popup {
            if popup.rect.contains(point) {
                return HoverTarget::Popup;
            }
        }

        if let Some(word) = self.words.iter().find(|w| w.rect.contains(point)) {
            let sentence = word
                .sentence_id
                .as_deref()
                .and_then(|id| self.sentence(id))
                .map(SentenceLayout::to_sentence_ref);
            return HoverTarget::Word {
                id: word.id.clone(),
                text: word.text.clone(),
                sentence,
            };
        }

        self.sentences
            .iter()
            .find(|s| s.rect.contains(point))
            .map(|s| HoverTarget::Sentence(s.to_sentence_ref()))
            .unwrap_or_default()
    }

    fn popup_visible(&self) -> bool {
        self.popup.is_some()
    }

    fn visible_sentence_bounds(&self) -> Option<Rect> {
        match &self.active_sentence_id {
            Some(id) => self.sentence(id).map(|s| s.rect),
            None => self.sentences.first().map(|s| s.rect),
        }
    }

    fn element_positions(&self) -> BTreeMap<String, Rect> {
        let mut positions: BTreeMap<String, Rect> = self
            .sentences
            .iter()
            .map(|s| (s.id.clone(), s.rect))
            .chain(self.words.iter().map(|w| (w.id.clone(), w.rect)))
            .collect();
        if let Some(popup) = &self.popup {
            positions.insert("word-popup".to_string(), popup.rect);
        }
        positions
    }

    fn apply(&mut self, event: &GazeEvent) {
        match event {
            GazeEvent::Fixation { word_id, word, .. } => self.open_popup(word_id, word),
            GazeEvent::Shake { .. } => self.popup = None,
            _ => {}
        }
        self.applied.push(event.clone());
    }
}
