/*!
 * Recognition of drawings through an asynchronous Read API.
 *
 * - `model`: wire types of the status resource and text flattening
 * - `job`: per-job state machine with sticky terminal states
 * - `cancel`: cancellation signal checked at every poll boundary
 * - `sequencer`: bounded submit-then-poll driver
 */

pub mod cancel;
pub mod job;
pub mod model;
pub mod sequencer;

pub use cancel::CancelToken;
pub use job::{JobState, RecognitionJob, RecognitionResult};
pub use model::{AnalyzeResult, JobHandle, OperationStatus, ReadOperation};
pub use sequencer::OcrSequencer;
