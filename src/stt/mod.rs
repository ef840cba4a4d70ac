pub mod adapter;
pub mod scripted;

pub use adapter::{RecognizerProvider, SpeechEvent, SpeechRecognizer, UnsupportedRecognizer};
pub use scripted::{ScriptedRecognizer, ScriptedSegment, ScriptedUtterance};
