//! Capture workflow state machine.
//!
//! One workflow instance drives one capture run at a time:
//!
//! ```text
//! Capturing -> Captured -> Recognizing -> Reviewing -> Saved
//!                   \__________ skip ______/    |
//!                                              retry -> Capturing
//! ```
//!
//! All methods take `&self`. State lives behind a mutex that is never held
//! across an `.await`, so a second call made while a suspending operation
//! is outstanding observes the in-flight marker and fails with
//! [`WorkflowError::Busy`]. Every async result is applied only if the run
//! token captured when the call started is still current.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{RecapError, RecognitionFailure, Result, WorkflowError};
use crate::extraction::ReceiptParser;
use crate::models::receipt::{ImageRef, ImageSource, ReceiptId, RecognitionResult};
use crate::ports::{ImageStore, PersistenceSink, TextRecognizer};
use crate::review::{DraftField, ResolvedFields, ReviewDraft, SaveRequest};

/// Identifies one capture run. Results of calls made under an older token
/// are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunToken(u64);

/// Discriminant of [`CaptureState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    Capturing,
    Captured,
    Recognizing,
    Reviewing,
    Saved,
    Cancelled,
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StateKind::Capturing => "capturing",
            StateKind::Captured => "captured",
            StateKind::Recognizing => "recognizing",
            StateKind::Reviewing => "reviewing",
            StateKind::Saved => "saved",
            StateKind::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Data held while the user reviews the draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub image: ImageRef,
    pub draft: ReviewDraft,
    /// Set when recognition ran and produced nothing usable.
    pub extraction_failed: Option<RecognitionFailure>,
}

/// Pipeline state. Each variant carries only the data valid in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureState {
    Capturing,
    Captured { image: ImageRef },
    Recognizing { image: ImageRef },
    Reviewing(Review),
    Saved { receipt_id: ReceiptId, image: ImageRef },
    Cancelled,
}

impl CaptureState {
    pub fn kind(&self) -> StateKind {
        match self {
            CaptureState::Capturing => StateKind::Capturing,
            CaptureState::Captured { .. } => StateKind::Captured,
            CaptureState::Recognizing { .. } => StateKind::Recognizing,
            CaptureState::Reviewing(_) => StateKind::Reviewing,
            CaptureState::Saved { .. } => StateKind::Saved,
            CaptureState::Cancelled => StateKind::Cancelled,
        }
    }

    /// The image still owned by the run, i.e. not yet attached to a record.
    fn owned_image(&self) -> Option<&ImageRef> {
        match self {
            CaptureState::Captured { image } | CaptureState::Recognizing { image } => Some(image),
            CaptureState::Reviewing(review) => Some(&review.image),
            CaptureState::Capturing | CaptureState::Saved { .. } | CaptureState::Cancelled => None,
        }
    }
}

/// Suspending operation currently outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InFlight {
    Storing,
    Recognizing,
    Saving,
}

#[derive(Debug)]
struct Inner {
    run: u64,
    state: CaptureState,
    in_flight: Option<InFlight>,
}

impl Inner {
    fn check_run(&self, run: RunToken) -> std::result::Result<(), WorkflowError> {
        if run.0 == self.run {
            Ok(())
        } else {
            Err(WorkflowError::StaleRun)
        }
    }

    fn check_idle(&self) -> std::result::Result<(), WorkflowError> {
        match self.in_flight {
            Some(_) => Err(WorkflowError::Busy),
            None => Ok(()),
        }
    }

    fn invalid(&self, operation: &'static str) -> RecapError {
        WorkflowError::InvalidState {
            operation,
            state: self.state.kind(),
        }
        .into()
    }
}

/// Marks a suspending call as outstanding for one run.
///
/// Dropped without [`Pending::settle`] (the caller abandoned the future),
/// it clears the marker and puts an interrupted recognition back to
/// `Captured`, provided the run is still current.
struct Pending<'a> {
    lock: &'a Mutex<Inner>,
    run: u64,
    kind: InFlight,
    armed: bool,
}

impl<'a> Pending<'a> {
    fn start(lock: &'a Mutex<Inner>, inner: &mut Inner, kind: InFlight) -> Self {
        inner.in_flight = Some(kind);
        Self {
            lock,
            run: inner.run,
            kind,
            armed: true,
        }
    }

    /// The call resumed and applies its own result.
    fn settle(mut self) {
        self.armed = false;
    }
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.run != self.run || inner.in_flight != Some(self.kind) {
            return;
        }

        inner.in_flight = None;
        if let CaptureState::Recognizing { image } = &inner.state {
            let image = image.clone();
            inner.state = CaptureState::Captured { image };
        }
        debug!("{:?} abandoned on run {}", self.kind, self.run);
    }
}

/// Drives one receipt from image to persisted record.
pub struct CaptureWorkflow<S: ImageStore, R: TextRecognizer, P: PersistenceSink> {
    store: S,
    recognizer: R,
    sink: P,
    parser: ReceiptParser,
    inner: Mutex<Inner>,
}

impl<S: ImageStore, R: TextRecognizer, P: PersistenceSink> CaptureWorkflow<S, R, P> {
    /// Create a workflow positioned at the start of a fresh run.
    pub fn new(store: S, recognizer: R, sink: P) -> Self {
        Self {
            store,
            recognizer,
            sink,
            parser: ReceiptParser::new(),
            inner: Mutex::new(Inner {
                run: 0,
                state: CaptureState::Capturing,
                in_flight: None,
            }),
        }
    }

    /// Use a configured parser for extraction.
    pub fn with_parser(mut self, parser: ReceiptParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn image_store(&self) -> &S {
        &self.store
    }

    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Token of the current run.
    pub fn current_run(&self) -> RunToken {
        RunToken(self.lock().run)
    }

    pub fn state(&self) -> StateKind {
        self.lock().state.kind()
    }

    /// Copy of the full current state.
    pub fn snapshot(&self) -> CaptureState {
        self.lock().state.clone()
    }

    /// Whether a suspending operation is outstanding.
    pub fn is_busy(&self) -> bool {
        self.lock().in_flight.is_some()
    }

    /// Drop the current run, release its image and start a new one.
    fn reset(&self, inner: &mut Inner, next: CaptureState) -> RunToken {
        if let Some(image) = inner.state.owned_image() {
            debug!("Releasing image {}", image);
            self.store.release(image);
        }
        if inner.in_flight.take().is_some() {
            debug!("Outstanding result for run {} will be discarded", inner.run);
        }
        inner.run += 1;
        inner.state = next;
        RunToken(inner.run)
    }

    /// Start a new run in `Capturing`, discarding whatever the previous run held.
    ///
    /// Refused while a save is in flight.
    pub fn begin_capture(&self) -> Result<RunToken> {
        let mut inner = self.lock();
        if inner.in_flight == Some(InFlight::Saving) {
            return Err(WorkflowError::Busy.into());
        }
        let run = self.reset(&mut inner, CaptureState::Capturing);
        info!("Capture run {} started", run.0);
        Ok(run)
    }

    /// Store an acquired image and move to `Captured`.
    ///
    /// On a store failure the run stays in `Capturing` so the caller can
    /// try again.
    pub async fn on_image_acquired(&self, run: RunToken, source: ImageSource) -> Result<ImageRef> {
        let pending = {
            let mut inner = self.lock();
            inner.check_run(run)?;
            inner.check_idle()?;
            if inner.state != CaptureState::Capturing {
                return Err(inner.invalid("on_image_acquired"));
            }
            Pending::start(&self.inner, &mut inner, InFlight::Storing)
        };

        let stored = self.store.store(&source).await;
        pending.settle();

        let mut inner = self.lock();
        if inner.check_run(run).is_err() {
            if let Ok(image) = &stored {
                debug!("Releasing image {} stored for a superseded run", image);
                self.store.release(image);
            }
            return Err(WorkflowError::StaleRun.into());
        }
        inner.in_flight = None;

        match stored {
            Ok(image) => {
                info!("Image stored at {}", image);
                inner.state = CaptureState::Captured {
                    image: image.clone(),
                };
                Ok(image)
            }
            Err(e) => {
                warn!("Image acquisition failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// Run text recognition and extraction, then move to `Reviewing`.
    ///
    /// Recognition failure is not an error: the run still reaches
    /// `Reviewing`, with an empty draft and `extraction_failed` set. If the
    /// run is reset while recognition is outstanding, the result is
    /// discarded and [`WorkflowError::StaleRun`] is returned.
    pub async fn request_recognition(&self, run: RunToken) -> Result<Review> {
        let (image, pending) = {
            let mut inner = self.lock();
            inner.check_run(run)?;
            inner.check_idle()?;
            let CaptureState::Captured { image } = &inner.state else {
                return Err(inner.invalid("request_recognition"));
            };
            let image = image.clone();
            inner.state = CaptureState::Recognizing {
                image: image.clone(),
            };
            let pending = Pending::start(&self.inner, &mut inner, InFlight::Recognizing);
            (image, pending)
        };

        info!("Recognizing text in {}", image);
        let result = self.recognizer.recognize(&image).await;
        pending.settle();

        let mut inner = self.lock();
        if inner.check_run(run).is_err() {
            debug!("Discarding recognition result for superseded run {}", run.0);
            return Err(WorkflowError::StaleRun.into());
        }
        inner.in_flight = None;

        let review = match classify(result) {
            Ok(text) => {
                let fields = self.parser.extract(&text);
                debug!("Extracted fields: {:?}", fields);
                Review {
                    image,
                    draft: ReviewDraft::from_extracted(fields),
                    extraction_failed: None,
                }
            }
            Err(failure) => {
                warn!("{}; falling back to manual entry", failure);
                Review {
                    image,
                    draft: ReviewDraft::empty(),
                    extraction_failed: Some(failure),
                }
            }
        };

        inner.state = CaptureState::Reviewing(review.clone());
        Ok(review)
    }

    /// Go straight to manual entry without calling the recognizer.
    pub fn skip_recognition(&self, run: RunToken) -> Result<()> {
        let mut inner = self.lock();
        inner.check_run(run)?;
        inner.check_idle()?;
        let CaptureState::Captured { image } = &inner.state else {
            return Err(inner.invalid("skip_recognition"));
        };

        info!("Recognition skipped, reviewing manually");
        inner.state = CaptureState::Reviewing(Review {
            image: image.clone(),
            draft: ReviewDraft::empty(),
            extraction_failed: None,
        });
        Ok(())
    }

    /// Override one draft field from user text and return the merged fields.
    pub fn edit_field(&self, run: RunToken, field: DraftField, value: &str) -> Result<ResolvedFields> {
        let mut inner = self.lock();
        inner.check_run(run)?;
        inner.check_idle()?;
        let state = inner.state.kind();
        let CaptureState::Reviewing(review) = &mut inner.state else {
            return Err(WorkflowError::InvalidState {
                operation: "edit_field",
                state,
            }
            .into());
        };

        review.draft.apply_edit(field, value)?;
        debug!("Edited {}", field);
        Ok(review.draft.resolve())
    }

    /// Discard the run and go back to `Capturing`.
    ///
    /// Allowed from `Captured`, `Reviewing` and, as cancellation, while
    /// recognition is outstanding.
    pub fn retry(&self) -> Result<RunToken> {
        let mut inner = self.lock();
        if inner.in_flight == Some(InFlight::Saving) {
            return Err(WorkflowError::Busy.into());
        }
        match inner.state.kind() {
            StateKind::Captured | StateKind::Recognizing | StateKind::Reviewing => {}
            _ => return Err(inner.invalid("retry")),
        }

        let run = self.reset(&mut inner, CaptureState::Capturing);
        info!("Retrying capture as run {}", run.0);
        Ok(run)
    }

    /// Abandon the run. The image is released and the state is terminal.
    pub fn cancel(&self) -> Result<()> {
        let mut inner = self.lock();
        if inner.in_flight == Some(InFlight::Saving) {
            return Err(WorkflowError::Busy.into());
        }
        if matches!(inner.state.kind(), StateKind::Saved | StateKind::Cancelled) {
            return Err(inner.invalid("cancel"));
        }

        self.reset(&mut inner, CaptureState::Cancelled);
        info!("Capture cancelled");
        Ok(())
    }

    /// Validate the draft, resolve the vendor and persist the receipt.
    ///
    /// Validation and persistence failures leave the run in `Reviewing` so
    /// the user can correct input or simply save again.
    pub async fn save(&self, run: RunToken, request: SaveRequest) -> Result<ReceiptId> {
        let (validated, image, pending) = {
            let mut inner = self.lock();
            inner.check_run(run)?;
            inner.check_idle()?;
            let CaptureState::Reviewing(review) = &inner.state else {
                return Err(inner.invalid("save"));
            };
            let validated = review.draft.validate(&request)?;
            let image = review.image.clone();
            let pending = Pending::start(&self.inner, &mut inner, InFlight::Saving);
            (validated, image, pending)
        };

        let persisted = async {
            let vendor = self.sink.find_or_create_vendor(&validated.vendor_name).await?;
            self.sink
                .insert_receipt(validated.into_receipt(image.clone(), vendor))
                .await
        }
        .await;
        pending.settle();

        let mut inner = self.lock();
        inner.in_flight = None;

        match persisted {
            Ok(receipt_id) => {
                info!("Receipt {} saved", receipt_id);
                inner.state = CaptureState::Saved { receipt_id, image };
                Ok(receipt_id)
            }
            Err(e) => {
                warn!("Saving receipt failed: {}", e);
                Err(e.into())
            }
        }
    }
}

impl<S: ImageStore, R: TextRecognizer, P: PersistenceSink> Drop for CaptureWorkflow<S, R, P> {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(image) = inner.state.owned_image() {
            debug!("Releasing image {} of abandoned run", image);
            self.store.release(image);
        }
    }
}

/// Usable text, or why there is none.
fn classify(result: RecognitionResult) -> std::result::Result<String, RecognitionFailure> {
    if !result.succeeded {
        let reason = result
            .failure_reason
            .unwrap_or_else(|| "OCR processing failed".to_string());
        return Err(RecognitionFailure::Recognizer(reason));
    }
    if result.raw_text.trim().is_empty() {
        return Err(RecognitionFailure::EmptyText);
    }
    Ok(result.raw_text)
}
