//! Turn-Taking Controller: speak the question, then listen for the answer, one turn at a time.
//!
//! `TurnController` is a synchronous state machine over an owned `SpeechIo` handle. Speech calls
//! are fire-and-forget; their completion comes back later as a `SpeechEvent`. The controller
//! never sleeps. A transition that needs a delay returns a `Wakeup`, and the owner hands it
//! back through `on_wakeup` once the delay has elapsed. `TurnDriver` is that owner for async
//! callers.
//!
//! Speech output and speech input never overlap: capture only starts after the synthesis-ended
//! event of the current utterance plus the settle delay, and every new utterance first releases
//! the microphone. End events of cancelled utterances are recognised by their `UtteranceId`.

#![allow(dead_code)]

use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

// ────────────────────────────────────────────────────────────────────────────
// Speech capability
// ────────────────────────────────────────────────────────────────────────────

/// Platform speech primitives. None of these return a result; outcomes are reported as
/// `SpeechEvent`s on whatever channel the implementation was built with.
pub trait SpeechIo: Send {
    /// Emits `SynthesisStarted(utterance)`, then `SynthesisEnded(utterance)` when playback
    /// finishes or is cancelled.
    fn synthesize(&mut self, utterance: UtteranceId, text: &str);
    /// Emits one `FinalTranscript` per finalized fragment, or `RecognitionError`.
    fn recognize(&mut self);
    fn cancel_synthesis(&mut self);
    fn stop_recognition(&mut self);
}

/// Identifies one `synthesize` call so its events can be told apart from those of an
/// utterance that was cancelled earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtteranceId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    SynthesisStarted(UtteranceId),
    SynthesisEnded(UtteranceId),
    FinalTranscript(String),
    RecognitionError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnTimings {
    /// Wait between cancelling an active utterance and speaking the replacement.
    pub debounce: Duration,
    /// Wait between the synthesis-ended event and opening the microphone.
    pub settle: Duration,
}

impl Default for TurnTimings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(200),
            settle: Duration::from_millis(500),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// State
// ────────────────────────────────────────────────────────────────────────────

/// Externally visible phase of the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    Speaking,
    /// Synthesis finished; waiting out the settle delay before listening.
    Settling,
    Listening,
    /// At least one transcript fragment captured; the answer can be submitted.
    AnswerReady,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TurnState {
    Idle,
    Speaking {
        question: String,
        utterance: UtteranceId,
    },
    /// The previous utterance was cancelled; `question` is spoken when the debounce fires.
    Debouncing { question: String },
    Settling,
    Listening { capturing: bool },
    AnswerReady { answer: String, capturing: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeupKind {
    RetrySynthesis,
    StartListening,
}

/// A delayed transition requested by the controller.
///
/// Carries the epoch it was armed in. `stop_all_audio` and every new turn start a new epoch, so
/// a wakeup armed before them is ignored when it finally fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wakeup {
    pub after: Duration,
    pub kind: WakeupKind,
    epoch: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TurnError {
    #[error("no answer has been captured yet")]
    EmptyAnswer,

    #[error("cannot {action} while {phase:?}")]
    InvalidPhase {
        action: &'static str,
        phase: TurnPhase,
    },

    #[error("turn driver has stopped")]
    DriverStopped,
}

// ────────────────────────────────────────────────────────────────────────────
// Controller
// ────────────────────────────────────────────────────────────────────────────

pub struct TurnController<S: SpeechIo> {
    speech: S,
    state: TurnState,
    muted: bool,
    timings: TurnTimings,
    epoch: u64,
    next_utterance: u64,
}

impl<S: SpeechIo> TurnController<S> {
    pub fn new(speech: S, timings: TurnTimings) -> Self {
        Self {
            speech,
            state: TurnState::Idle,
            muted: false,
            timings,
            epoch: 0,
            next_utterance: 0,
        }
    }

    pub fn phase(&self) -> TurnPhase {
        match self.state {
            TurnState::Idle => TurnPhase::Idle,
            TurnState::Speaking { .. } | TurnState::Debouncing { .. } => TurnPhase::Speaking,
            TurnState::Settling => TurnPhase::Settling,
            TurnState::Listening { .. } => TurnPhase::Listening,
            TurnState::AnswerReady { .. } => TurnPhase::AnswerReady,
        }
    }

    /// The answer accumulated so far in this turn.
    pub fn answer(&self) -> &str {
        match &self.state {
            TurnState::AnswerReady { answer, .. } => answer,
            _ => "",
        }
    }

    pub fn is_capturing(&self) -> bool {
        matches!(
            self.state,
            TurnState::Listening { capturing: true } | TurnState::AnswerReady { capturing: true, .. }
        )
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Takes effect at the start of the next turn.
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// `Idle → Speaking`, or straight to `Listening` when muted.
    ///
    /// While an utterance is already playing it is cancelled once and the new question is
    /// spoken after the debounce delay. Further calls during that delay only replace the
    /// question that will be spoken.
    pub fn begin_turn(&mut self, question: &str) -> Option<Wakeup> {
        let question = question.to_string();

        if self.muted {
            self.stop_all_audio();
            self.start_listening();
            return None;
        }

        match self.state {
            TurnState::Debouncing { .. } => {
                self.state = TurnState::Debouncing { question };
                None
            }
            TurnState::Speaking { .. } => {
                debug!("Synthesis already active; cancelling before retry");
                self.speech.cancel_synthesis();
                self.epoch += 1;
                self.state = TurnState::Debouncing { question };
                Some(self.wakeup(WakeupKind::RetrySynthesis, self.timings.debounce))
            }
            _ => {
                self.stop_all_audio();
                self.speak(question);
                None
            }
        }
    }

    pub fn on_event(&mut self, event: SpeechEvent) -> Option<Wakeup> {
        match event {
            SpeechEvent::SynthesisStarted(_) => None,
            SpeechEvent::SynthesisEnded(ended) => match self.state {
                TurnState::Speaking { utterance, .. } if utterance == ended => {
                    self.state = TurnState::Settling;
                    Some(self.wakeup(WakeupKind::StartListening, self.timings.settle))
                }
                _ => {
                    debug!("Ignoring end of superseded utterance {ended:?}");
                    None
                }
            },
            SpeechEvent::FinalTranscript(fragment) => {
                self.append_fragment(&fragment);
                None
            }
            SpeechEvent::RecognitionError(message) => {
                if let TurnState::Listening { capturing } | TurnState::AnswerReady { capturing, .. } =
                    &mut self.state
                {
                    if *capturing {
                        warn!("Speech recognition failed: {message}");
                        *capturing = false;
                    }
                }
                None
            }
        }
    }

    pub fn on_wakeup(&mut self, wakeup: Wakeup) {
        if wakeup.epoch != self.epoch {
            debug!("Ignoring stale {:?} wakeup", wakeup.kind);
            return;
        }

        match (wakeup.kind, &self.state) {
            (WakeupKind::RetrySynthesis, TurnState::Debouncing { question }) => {
                let question = question.clone();
                self.speak(question);
            }
            (WakeupKind::StartListening, TurnState::Settling) => self.start_listening(),
            _ => {}
        }
    }

    /// Cancels synthesis, stops recognition and drops any partial answer. Safe to call from
    /// any phase, any number of times.
    pub fn stop_all_audio(&mut self) {
        if matches!(self.state, TurnState::Speaking { .. }) {
            self.speech.cancel_synthesis();
        }
        if self.is_capturing() {
            self.speech.stop_recognition();
        }
        if self.state != TurnState::Idle {
            debug!("Released audio from {:?}", self.phase());
        }
        self.epoch += 1;
        self.state = TurnState::Idle;
    }

    /// Stops capture but keeps what has been heard so far.
    pub fn pause_listening(&mut self) -> Result<(), TurnError> {
        let phase = self.phase();
        match &mut self.state {
            TurnState::Listening { capturing } | TurnState::AnswerReady { capturing, .. } => {
                if *capturing {
                    self.speech.stop_recognition();
                    *capturing = false;
                }
                Ok(())
            }
            _ => Err(TurnError::InvalidPhase {
                action: "pause listening",
                phase,
            }),
        }
    }

    /// Restarts capture, appending to what has been heard so far. Refused while speaking.
    pub fn resume_listening(&mut self) -> Result<(), TurnError> {
        if self.state == TurnState::Idle {
            self.start_listening();
            return Ok(());
        }

        let phase = self.phase();
        match &mut self.state {
            TurnState::Listening { capturing } | TurnState::AnswerReady { capturing, .. } => {
                if !*capturing {
                    self.speech.recognize();
                    *capturing = true;
                }
                Ok(())
            }
            _ => Err(TurnError::InvalidPhase {
                action: "resume listening",
                phase,
            }),
        }
    }

    /// The "Next" action: hands back the captured answer and ends the turn.
    pub fn submit_answer(&mut self) -> Result<String, TurnError> {
        let phase = self.phase();
        match std::mem::replace(&mut self.state, TurnState::Idle) {
            TurnState::AnswerReady { answer, capturing } => {
                if capturing {
                    self.speech.stop_recognition();
                }
                self.epoch += 1;
                info!("Answer submitted ({} chars)", answer.len());
                Ok(answer)
            }
            other => {
                self.state = other;
                Err(match phase {
                    TurnPhase::Listening => TurnError::EmptyAnswer,
                    _ => TurnError::InvalidPhase {
                        action: "submit an answer",
                        phase,
                    },
                })
            }
        }
    }

    fn speak(&mut self, question: String) {
        let utterance = UtteranceId(self.next_utterance);
        self.next_utterance += 1;
        self.speech.synthesize(utterance, &question);
        self.state = TurnState::Speaking {
            question,
            utterance,
        };
    }

    fn start_listening(&mut self) {
        self.speech.recognize();
        self.state = TurnState::Listening { capturing: true };
    }

    fn append_fragment(&mut self, fragment: &str) {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return;
        }

        let next = match &mut self.state {
            TurnState::Listening { capturing: true } => Some(TurnState::AnswerReady {
                answer: fragment.to_string(),
                capturing: true,
            }),
            TurnState::AnswerReady {
                answer,
                capturing: true,
            } => {
                answer.push(' ');
                answer.push_str(fragment);
                None
            }
            _ => {
                debug!("Dropping transcript fragment received outside capture");
                None
            }
        };
        if let Some(next) = next {
            self.state = next;
        }
    }

    fn wakeup(&self, kind: WakeupKind, after: Duration) -> Wakeup {
        Wakeup {
            after,
            kind,
            epoch: self.epoch,
        }
    }
}

impl<S: SpeechIo> Drop for TurnController<S> {
    fn drop(&mut self) {
        self.stop_all_audio();
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Async driver
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnCommand {
    BeginTurn(String),
    Submit,
    StopAll,
    PauseListening,
    ResumeListening,
    SetMuted(bool),
    Status,
}

struct Reply {
    phase: TurnPhase,
    answer: Option<String>,
}

struct Request {
    command: TurnCommand,
    reply: oneshot::Sender<Result<Reply, TurnError>>,
}

/// Owns a `TurnController` and feeds it speech events, caller commands and its own timers.
///
/// When every `TurnHandle` is dropped the driver stops and releases all audio.
pub struct TurnDriver<S: SpeechIo> {
    controller: TurnController<S>,
    events: mpsc::UnboundedReceiver<SpeechEvent>,
    requests: mpsc::Receiver<Request>,
}

#[derive(Clone)]
pub struct TurnHandle {
    requests: mpsc::Sender<Request>,
}

impl<S: SpeechIo> TurnDriver<S> {
    pub fn new(
        controller: TurnController<S>,
        events: mpsc::UnboundedReceiver<SpeechEvent>,
    ) -> (Self, TurnHandle) {
        let (tx, rx) = mpsc::channel(16);
        let driver = Self {
            controller,
            events,
            requests: rx,
        };
        (driver, TurnHandle { requests: tx })
    }

    pub async fn run(self) {
        let TurnDriver {
            mut controller,
            mut events,
            mut requests,
        } = self;
        let mut timer: Option<(Instant, Wakeup)> = None;

        loop {
            let deadline = timer.as_ref().map(|(at, _)| *at);

            tokio::select! {
                biased;

                Some(event) = events.recv() => {
                    let wakeup = controller.on_event(event);
                    arm(&mut timer, wakeup);
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some((_, wakeup)) = timer.take() {
                        controller.on_wakeup(wakeup);
                    }
                }
                request = requests.recv() => match request {
                    Some(request) => handle(&mut controller, &mut timer, request),
                    None => break,
                },
            }
        }

        info!("Turn driver stopped");
        controller.stop_all_audio();
    }
}

fn arm(timer: &mut Option<(Instant, Wakeup)>, wakeup: Option<Wakeup>) {
    if let Some(wakeup) = wakeup {
        *timer = Some((Instant::now() + wakeup.after, wakeup));
    }
}

fn handle<S: SpeechIo>(
    controller: &mut TurnController<S>,
    timer: &mut Option<(Instant, Wakeup)>,
    request: Request,
) {
    let Request { command, reply } = request;
    let mut answer = None;

    let result = match command {
        TurnCommand::BeginTurn(question) => {
            let wakeup = controller.begin_turn(&question);
            arm(timer, wakeup);
            Ok(())
        }
        TurnCommand::Submit => match controller.submit_answer() {
            Ok(text) => {
                answer = Some(text);
                *timer = None;
                Ok(())
            }
            Err(e) => Err(e),
        },
        TurnCommand::StopAll => {
            controller.stop_all_audio();
            *timer = None;
            Ok(())
        }
        TurnCommand::PauseListening => controller.pause_listening(),
        TurnCommand::ResumeListening => controller.resume_listening(),
        TurnCommand::SetMuted(muted) => {
            controller.set_muted(muted);
            Ok(())
        }
        TurnCommand::Status => Ok(()),
    };

    // The caller may have given up waiting; nothing to do then.
    let _ = reply.send(result.map(|()| Reply {
        phase: controller.phase(),
        answer,
    }));
}

impl TurnHandle {
    async fn send(&self, command: TurnCommand) -> Result<Reply, TurnError> {
        let (tx, rx) = oneshot::channel();
        self.requests
            .send(Request { command, reply: tx })
            .await
            .map_err(|_| TurnError::DriverStopped)?;
        rx.await.map_err(|_| TurnError::DriverStopped)?
    }

    pub async fn begin_turn(&self, question: impl Into<String>) -> Result<TurnPhase, TurnError> {
        Ok(self.send(TurnCommand::BeginTurn(question.into())).await?.phase)
    }

    pub async fn submit(&self) -> Result<String, TurnError> {
        self.send(TurnCommand::Submit)
            .await?
            .answer
            .ok_or(TurnError::EmptyAnswer)
    }

    pub async fn stop_all(&self) -> Result<TurnPhase, TurnError> {
        Ok(self.send(TurnCommand::StopAll).await?.phase)
    }

    pub async fn pause_listening(&self) -> Result<TurnPhase, TurnError> {
        Ok(self.send(TurnCommand::PauseListening).await?.phase)
    }

    pub async fn resume_listening(&self) -> Result<TurnPhase, TurnError> {
        Ok(self.send(TurnCommand::ResumeListening).await?.phase)
    }

    pub async fn set_muted(&self, muted: bool) -> Result<TurnPhase, TurnError> {
        Ok(self.send(TurnCommand::SetMuted(muted)).await?.phase)
    }

    pub async fn status(&self) -> Result<TurnPhase, TurnError> {
        Ok(self.send(TurnCommand::Status).await?.phase)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Synthesize(String),
        Recognize,
        CancelSynthesis,
        StopRecognition,
    }

    #[derive(Clone, Default)]
    struct RecordingSpeech {
        calls: Arc<Mutex<Vec<Call>>>,
        utterances: Arc<Mutex<Vec<UtteranceId>>>,
    }

    impl RecordingSpeech {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        /// Id of the n-th `synthesize` call.
        fn utterance(&self, n: usize) -> UtteranceId {
            self.utterances.lock().unwrap()[n]
        }

        fn ended(&self, n: usize) -> SpeechEvent {
            SpeechEvent::SynthesisEnded(self.utterance(n))
        }
    }

    impl SpeechIo for RecordingSpeech {
        fn synthesize(&mut self, utterance: UtteranceId, text: &str) {
            self.utterances.lock().unwrap().push(utterance);
            self.calls
                .lock()
                .unwrap()
                .push(Call::Synthesize(text.to_string()));
        }
        fn recognize(&mut self) {
            self.calls.lock().unwrap().push(Call::Recognize);
        }
        fn cancel_synthesis(&mut self) {
            self.calls.lock().unwrap().push(Call::CancelSynthesis);
        }
        fn stop_recognition(&mut self) {
            self.calls.lock().unwrap().push(Call::StopRecognition);
        }
    }

    fn controller() -> (TurnController<RecordingSpeech>, RecordingSpeech) {
        let speech = RecordingSpeech::default();
        (
            TurnController::new(speech.clone(), TurnTimings::default()),
            speech,
        )
    }

    fn speak(text: &str) -> Call {
        Call::Synthesize(text.to_string())
    }

    /// Drives a controller from `Idle` to capturing.
    fn listening() -> (TurnController<RecordingSpeech>, RecordingSpeech) {
        let (mut c, speech) = controller();
        c.begin_turn("Q1");
        let settle = c.on_event(speech.ended(0)).unwrap();
        c.on_wakeup(settle);
        assert_eq!(c.phase(), TurnPhase::Listening);
        (c, speech)
    }

    #[test]
    fn test_speaks_then_listens_only_after_synthesis_end() {
        let (mut c, speech) = controller();

        assert_eq!(c.begin_turn("Q1"), None);
        assert_eq!(c.phase(), TurnPhase::Speaking);
        assert_eq!(
            c.on_event(SpeechEvent::SynthesisStarted(speech.utterance(0))),
            None
        );
        assert_eq!(speech.calls(), vec![speak("Q1")]);

        let settle = c.on_event(speech.ended(0)).unwrap();
        assert_eq!(settle.kind, WakeupKind::StartListening);
        assert_eq!(settle.after, Duration::from_millis(500));
        assert_eq!(c.phase(), TurnPhase::Settling);
        assert_eq!(speech.calls(), vec![speak("Q1")]);

        c.on_wakeup(settle);
        assert_eq!(c.phase(), TurnPhase::Listening);
        assert_eq!(speech.calls(), vec![speak("Q1"), Call::Recognize]);
    }

    #[test]
    fn test_overlapping_turn_cancels_once_and_retries_once() {
        let (mut c, speech) = controller();
        c.begin_turn("Q1");

        let retry = c.begin_turn("Q2").unwrap();
        assert_eq!(retry.kind, WakeupKind::RetrySynthesis);
        assert_eq!(retry.after, Duration::from_millis(200));
        // A third request inside the debounce window schedules nothing new.
        assert_eq!(c.begin_turn("Q3"), None);

        // The cancelled utterance reports its end; that must not open the microphone.
        assert_eq!(c.on_event(speech.ended(0)), None);
        assert_eq!(c.phase(), TurnPhase::Speaking);

        c.on_wakeup(retry);
        assert_eq!(
            speech.calls(),
            vec![speak("Q1"), Call::CancelSynthesis, speak("Q3")]
        );
        assert_eq!(c.phase(), TurnPhase::Speaking);
    }

    #[test]
    fn test_fragments_accumulate_into_answer() {
        let (mut c, _speech) = listening();
        assert_eq!(c.submit_answer(), Err(TurnError::EmptyAnswer));

        c.on_event(SpeechEvent::FinalTranscript("I built".to_string()));
        assert_eq!(c.phase(), TurnPhase::AnswerReady);
        c.on_event(SpeechEvent::FinalTranscript("   ".to_string()));
        c.on_event(SpeechEvent::FinalTranscript(" a cache. ".to_string()));

        assert_eq!(c.answer(), "I built a cache.");
        assert_eq!(c.submit_answer().unwrap(), "I built a cache.");
        assert_eq!(c.phase(), TurnPhase::Idle);
        assert!(!c.is_capturing());
    }

    #[test]
    fn test_submit_stops_capture() {
        let (mut c, speech) = listening();
        c.on_event(SpeechEvent::FinalTranscript("answer".to_string()));
        c.submit_answer().unwrap();
        assert_eq!(speech.calls().last(), Some(&Call::StopRecognition));
    }

    #[test]
    fn test_muted_turn_skips_speaking() {
        let (mut c, speech) = controller();
        c.set_muted(true);

        assert_eq!(c.begin_turn("Q1"), None);
        assert_eq!(c.phase(), TurnPhase::Listening);
        assert_eq!(speech.calls(), vec![Call::Recognize]);
    }

    #[test]
    fn test_stop_all_audio_is_idempotent() {
        let (mut c, speech) = listening();
        c.on_event(SpeechEvent::FinalTranscript("partial".to_string()));

        c.stop_all_audio();
        c.stop_all_audio();

        assert_eq!(c.phase(), TurnPhase::Idle);
        assert_eq!(c.answer(), "");
        let stops = speech
            .calls()
            .into_iter()
            .filter(|call| *call == Call::StopRecognition)
            .count();
        assert_eq!(stops, 1);
    }

    #[test]
    fn test_stop_while_speaking_cancels_and_invalidates_timers() {
        let (mut c, speech) = controller();
        c.begin_turn("Q1");
        let retry = c.begin_turn("Q2").unwrap();

        c.stop_all_audio();
        c.on_wakeup(retry);

        assert_eq!(c.phase(), TurnPhase::Idle);
        assert_eq!(speech.calls(), vec![speak("Q1"), Call::CancelSynthesis]);
    }

    #[test]
    fn test_stale_settle_wakeup_is_ignored_after_new_turn() {
        let (mut c, speech) = controller();
        c.begin_turn("Q1");
        let settle = c.on_event(speech.ended(0)).unwrap();

        c.begin_turn("Q2");
        c.on_wakeup(settle);

        assert_eq!(c.phase(), TurnPhase::Speaking);
        assert!(!speech.calls().contains(&Call::Recognize));
    }

    #[test]
    fn test_late_end_of_stopped_utterance_does_not_open_microphone() {
        let (mut c, speech) = controller();
        c.begin_turn("Q1");
        c.stop_all_audio();
        assert_eq!(c.begin_turn("Q2"), None);

        // Q1's cancellation is reported only after Q2 has started playing.
        assert_eq!(c.on_event(speech.ended(0)), None);
        assert_eq!(c.phase(), TurnPhase::Speaking);
        assert!(!speech.calls().contains(&Call::Recognize));

        let settle = c.on_event(speech.ended(1)).unwrap();
        c.on_wakeup(settle);
        assert_eq!(c.phase(), TurnPhase::Listening);
        assert_eq!(
            speech.calls(),
            vec![
                speak("Q1"),
                Call::CancelSynthesis,
                speak("Q2"),
                Call::Recognize
            ]
        );
    }

    #[test]
    fn test_pause_and_resume_keep_answer() {
        let (mut c, speech) = listening();
        c.on_event(SpeechEvent::FinalTranscript("first".to_string()));

        c.pause_listening().unwrap();
        assert!(!c.is_capturing());
        c.on_event(SpeechEvent::FinalTranscript("ignored".to_string()));

        c.resume_listening().unwrap();
        c.on_event(SpeechEvent::FinalTranscript("second".to_string()));
        assert_eq!(c.answer(), "first second");
        assert_eq!(
            speech.calls(),
            vec![
                speak("Q1"),
                Call::Recognize,
                Call::StopRecognition,
                Call::Recognize
            ]
        );
    }

    #[test]
    fn test_resume_refused_while_speaking() {
        let (mut c, _speech) = controller();
        c.begin_turn("Q1");
        assert_eq!(
            c.resume_listening(),
            Err(TurnError::InvalidPhase {
                action: "resume listening",
                phase: TurnPhase::Speaking
            })
        );
    }

    #[test]
    fn test_recognition_error_keeps_answer_submittable() {
        let (mut c, _speech) = listening();
        c.on_event(SpeechEvent::FinalTranscript("half an answer".to_string()));
        c.on_event(SpeechEvent::RecognitionError("network".to_string()));

        assert!(!c.is_capturing());
        assert_eq!(c.submit_answer().unwrap(), "half an answer");
    }

    #[test]
    fn test_drop_releases_microphone() {
        let (c, speech) = listening();
        drop(c);
        assert_eq!(speech.calls().last(), Some(&Call::StopRecognition));
    }

    // ── driver ──────────────────────────────────────────────────────────────

    fn driver() -> (
        TurnHandle,
        mpsc::UnboundedSender<SpeechEvent>,
        RecordingSpeech,
        tokio::task::JoinHandle<()>,
    ) {
        let (c, speech) = controller();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (driver, handle) = TurnDriver::new(c, events_rx);
        let task = tokio::spawn(driver.run());
        (handle, events_tx, speech, task)
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_full_turn_with_settle_delay() {
        let (handle, events, speech, _task) = driver();

        assert_eq!(handle.begin_turn("Q1").await.unwrap(), TurnPhase::Speaking);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(handle.status().await.unwrap(), TurnPhase::Speaking);

        events.send(speech.ended(0)).unwrap();
        assert_eq!(handle.status().await.unwrap(), TurnPhase::Settling);

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert_eq!(handle.status().await.unwrap(), TurnPhase::Settling);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(handle.status().await.unwrap(), TurnPhase::Listening);

        events
            .send(SpeechEvent::FinalTranscript("I built".to_string()))
            .unwrap();
        events
            .send(SpeechEvent::FinalTranscript("a cache.".to_string()))
            .unwrap();
        assert_eq!(handle.submit().await.unwrap(), "I built a cache.");
        assert_eq!(
            speech.calls(),
            vec![speak("Q1"), Call::Recognize, Call::StopRecognition]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_debounces_overlapping_turns() {
        let (handle, events, speech, _task) = driver();

        handle.begin_turn("Q1").await.unwrap();
        handle.begin_turn("Q2").await.unwrap();
        events.send(speech.ended(0)).unwrap();
        assert_eq!(handle.status().await.unwrap(), TurnPhase::Speaking);

        tokio::time::sleep(Duration::from_millis(199)).await;
        assert_eq!(speech.calls(), vec![speak("Q1"), Call::CancelSynthesis]);

        tokio::time::sleep(Duration::from_millis(2)).await;
        handle.status().await.unwrap();
        assert_eq!(
            speech.calls(),
            vec![speak("Q1"), Call::CancelSynthesis, speak("Q2")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_stop_then_new_turn_ignores_stale_end() {
        let (handle, events, speech, _task) = driver();

        handle.begin_turn("Q1").await.unwrap();
        handle.stop_all().await.unwrap();
        handle.begin_turn("Q2").await.unwrap();
        events.send(speech.ended(0)).unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(handle.status().await.unwrap(), TurnPhase::Speaking);
        assert!(!speech.calls().contains(&Call::Recognize));
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_submit_without_answer_is_refused() {
        let (handle, _events, _speech, _task) = driver();
        handle.set_muted(true).await.unwrap();
        assert_eq!(handle.begin_turn("Q1").await.unwrap(), TurnPhase::Listening);
        assert_eq!(handle.submit().await, Err(TurnError::EmptyAnswer));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handles_stops_driver_and_releases_audio() {
        let (handle, _events, speech, task) = driver();
        handle.set_muted(true).await.unwrap();
        handle.begin_turn("Q1").await.unwrap();

        drop(handle);
        task.await.unwrap();
        assert_eq!(speech.calls(), vec![Call::Recognize, Call::StopRecognition]);
    }
}
