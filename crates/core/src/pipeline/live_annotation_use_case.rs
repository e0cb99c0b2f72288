use std::time::{Duration, Instant};

use crate::analysis::domain::face_analyzer::FaceAnalyzer;
use crate::analysis::domain::face_observation::FaceObservation;
use crate::annotation::domain::annotation_sink::{AnnotationSink, KeyEvent};
use crate::annotation::domain::overlay::build_overlays;
use crate::capture::domain::frame_source::FrameSource;
use crate::pipeline::status_reporter::StatusReporter;
use crate::shared::frame::Frame;

/// How the live session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopEnd {
    /// The quit key was pressed.
    Quit,
    /// The frame source stopped yielding frames.
    SourceExhausted,
}

/// Outcome of a single loop iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Continue,
    Stop,
}

/// Drives the capture → analyze → render loop.
///
/// Owns the timer gate and the last successfully computed result set,
/// which keeps rendering stable while analysis is skipped or failing.
/// The result set is replaced wholesale on each successful analysis,
/// never merged.
pub struct LiveAnnotationUseCase {
    source: Box<dyn FrameSource>,
    analyzer: Box<dyn FaceAnalyzer>,
    sink: Box<dyn AnnotationSink>,
    reporter: Box<dyn StatusReporter>,
    interval: Duration,
    last_analysis: Option<Instant>,
    observations: Vec<FaceObservation>,
}

impl LiveAnnotationUseCase {
    pub fn new(
        source: Box<dyn FrameSource>,
        analyzer: Box<dyn FaceAnalyzer>,
        sink: Box<dyn AnnotationSink>,
        reporter: Box<dyn StatusReporter>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            analyzer,
            sink,
            reporter,
            interval,
            last_analysis: None,
            observations: Vec::new(),
        }
    }

    /// Runs until the quit key, source exhaustion, or a sink error.
    ///
    /// The source and sink are released on every exit path.
    pub fn run(&mut self) -> Result<LoopEnd, Box<dyn std::error::Error>> {
        let result = self.run_inner();
        self.source.close();
        self.sink.close();
        result
    }

    fn run_inner(&mut self) -> Result<LoopEnd, Box<dyn std::error::Error>> {
        loop {
            let frame = match self.source.grab() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    self.reporter.capture_failed();
                    return Ok(LoopEnd::SourceExhausted);
                }
                Err(e) => {
                    log::warn!("Frame grab failed: {e}");
                    self.reporter.capture_failed();
                    return Ok(LoopEnd::SourceExhausted);
                }
            };
            if self.step(&frame, Instant::now())? == Step::Stop {
                return Ok(LoopEnd::Quit);
            }
        }
    }

    /// One loop iteration against an explicit clock value.
    ///
    /// A failed analysis keeps the previous result set and leaves the
    /// timer untouched, so every following eligible iteration retries.
    fn step(&mut self, frame: &Frame, now: Instant) -> Result<Step, Box<dyn std::error::Error>> {
        if self.analysis_due(now) {
            match self.analyzer.analyze(frame) {
                Ok(outcome) => {
                    self.observations = outcome.into_faces();
                    self.last_analysis = Some(now);
                    self.reporter.analysis_complete(&self.observations);
                }
                Err(e) => self.reporter.analysis_failed(&e.to_string()),
            }
        }

        let overlays = build_overlays(&self.observations);
        match self.sink.present(frame, &overlays)? {
            KeyEvent::Quit => Ok(Step::Stop),
            KeyEvent::None => Ok(Step::Continue),
        }
    }

    /// The gate: analyze on the first frame, then whenever more than
    /// the interval has elapsed since the last successful analysis.
    fn analysis_due(&self, now: Instant) -> bool {
        match self.last_analysis {
            Some(last) => now.duration_since(last) > self.interval,
            None => true,
        }
    }

    /// The result set currently visible to rendering.
    pub fn observations(&self) -> &[FaceObservation] {
        &self.observations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::analysis::domain::face_analyzer::AnalysisOutcome;
    use crate::analysis::domain::face_observation::{AgeReading, GenderReading};
    use crate::annotation::domain::overlay::Overlay;
    use crate::shared::region::Region;

    // --- Stubs ---

    struct ScriptedSource {
        grabs: VecDeque<Result<Option<Frame>, String>>,
        closes: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        fn new(grabs: Vec<Result<Option<Frame>, String>>) -> (Self, Arc<AtomicUsize>) {
            let closes = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    grabs: grabs.into(),
                    closes: closes.clone(),
                },
                closes,
            )
        }
    }

    impl FrameSource for ScriptedSource {
        fn grab(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
            match self.grabs.pop_front() {
                Some(Ok(frame)) => Ok(frame),
                Some(Err(detail)) => Err(detail.into()),
                None => Ok(None),
            }
        }

        fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct ScriptedAnalyzer {
        outcomes: VecDeque<Result<AnalysisOutcome, String>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedAnalyzer {
        fn new(outcomes: Vec<Result<AnalysisOutcome, String>>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    outcomes: outcomes.into(),
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    impl FaceAnalyzer for ScriptedAnalyzer {
        fn analyze(
            &mut self,
            _frame: &Frame,
        ) -> Result<AnalysisOutcome, Box<dyn std::error::Error>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.outcomes.pop_front() {
                Some(Ok(outcome)) => Ok(outcome),
                Some(Err(detail)) => Err(detail.into()),
                None => Ok(AnalysisOutcome::Faces(Vec::new())),
            }
        }
    }

    struct RecordingSink {
        presented: Arc<Mutex<Vec<Vec<Overlay>>>>,
        keys: VecDeque<Result<KeyEvent, String>>,
        closes: Arc<AtomicUsize>,
    }

    impl RecordingSink {
        #[allow(clippy::type_complexity)]
        fn new(
            keys: Vec<Result<KeyEvent, String>>,
        ) -> (Self, Arc<Mutex<Vec<Vec<Overlay>>>>, Arc<AtomicUsize>) {
            let presented = Arc::new(Mutex::new(Vec::new()));
            let closes = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    presented: presented.clone(),
                    keys: keys.into(),
                    closes: closes.clone(),
                },
                presented,
                closes,
            )
        }
    }

    impl AnnotationSink for RecordingSink {
        fn present(
            &mut self,
            _frame: &Frame,
            overlays: &[Overlay],
        ) -> Result<KeyEvent, Box<dyn std::error::Error>> {
            self.presented.lock().unwrap().push(overlays.to_vec());
            match self.keys.pop_front() {
                Some(Ok(event)) => Ok(event),
                Some(Err(detail)) => Err(detail.into()),
                None => Ok(KeyEvent::None),
            }
        }

        fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct RecordingReporter {
        events: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingReporter {
        fn new() -> (Self, Arc<Mutex<Vec<String>>>) {
            let events = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    events: events.clone(),
                },
                events,
            )
        }
    }

    impl StatusReporter for RecordingReporter {
        fn analysis_complete(&mut self, observations: &[FaceObservation]) {
            self.events
                .lock()
                .unwrap()
                .push(format!("complete:{}", observations.len()));
        }

        fn analysis_failed(&mut self, detail: &str) {
            self.events.lock().unwrap().push(format!("failed:{detail}"));
        }

        fn capture_failed(&mut self) {
            self.events.lock().unwrap().push("capture_failed".to_string());
        }
    }

    // --- Helpers ---

    fn frame() -> Frame {
        Frame::new(vec![0; 12], 2, 2, 3)
    }

    fn observation(emotion: &str) -> FaceObservation {
        FaceObservation {
            region: Region::new(10, 10, 40, 40),
            dominant_emotion: emotion.to_string(),
            age: AgeReading::Years(29.6),
            gender: GenderReading::Scored(vec![
                ("Woman".to_string(), 0.9),
                ("Man".to_string(), 0.1),
            ]),
        }
    }

    fn use_case_with(
        analyzer_outcomes: Vec<Result<AnalysisOutcome, String>>,
    ) -> (
        LiveAnnotationUseCase,
        Arc<AtomicUsize>,
        Arc<Mutex<Vec<Vec<Overlay>>>>,
        Arc<Mutex<Vec<String>>>,
    ) {
        let (source, _closes) = ScriptedSource::new(Vec::new());
        let (analyzer, calls) = ScriptedAnalyzer::new(analyzer_outcomes);
        let (sink, presented, _sink_closes) = RecordingSink::new(Vec::new());
        let (reporter, events) = RecordingReporter::new();
        let use_case = LiveAnnotationUseCase::new(
            Box::new(source),
            Box::new(analyzer),
            Box::new(sink),
            Box::new(reporter),
            Duration::from_secs(2),
        );
        (use_case, calls, presented, events)
    }

    // --- step: timer gate ---

    #[test]
    fn test_first_step_always_analyzes() {
        let (mut uc, calls, presented, _) = use_case_with(vec![Ok(AnalysisOutcome::Faces(vec![
            observation("happy"),
        ]))]);
        let t0 = Instant::now();

        uc.step(&frame(), t0).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(uc.observations().len(), 1);
        let presented = presented.lock().unwrap();
        assert_eq!(presented[0][0].label, "P1: Woman, happy, 29");
    }

    #[test]
    fn test_step_within_interval_skips_analysis_and_redraws_stale() {
        let (mut uc, calls, presented, _) = use_case_with(vec![Ok(AnalysisOutcome::Faces(vec![
            observation("happy"),
        ]))]);
        let t0 = Instant::now();

        uc.step(&frame(), t0).unwrap();
        uc.step(&frame(), t0 + Duration::from_secs(1)).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let presented = presented.lock().unwrap();
        assert_eq!(presented.len(), 2);
        // Stale rendering: the second frame draws the identical overlays
        assert_eq!(presented[0], presented[1]);
    }

    #[test]
    fn test_step_at_exact_interval_boundary_skips() {
        let (mut uc, calls, _, _) = use_case_with(vec![Ok(AnalysisOutcome::Faces(Vec::new()))]);
        let t0 = Instant::now();

        uc.step(&frame(), t0).unwrap();
        uc.step(&frame(), t0 + Duration::from_secs(2)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        uc.step(&frame(), t0 + Duration::from_millis(2001)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_single_outcome_normalized_to_sequence() {
        let (mut uc, _, presented, _) = use_case_with(vec![Ok(AnalysisOutcome::Single(Box::new(
            observation("happy"),
        )))]);

        uc.step(&frame(), Instant::now()).unwrap();

        assert_eq!(uc.observations().len(), 1);
        assert_eq!(presented.lock().unwrap()[0].len(), 1);
    }

    #[test]
    fn test_empty_result_set_renders_no_overlays() {
        let (mut uc, _, presented, _) = use_case_with(vec![Ok(AnalysisOutcome::Faces(Vec::new()))]);

        uc.step(&frame(), Instant::now()).unwrap();

        assert!(uc.observations().is_empty());
        assert!(presented.lock().unwrap()[0].is_empty());
    }

    // --- step: analysis failure ---

    #[test]
    fn test_analyzer_error_keeps_previous_results_and_reports() {
        let (mut uc, _, presented, events) = use_case_with(vec![
            Ok(AnalysisOutcome::Faces(vec![observation("happy")])),
            Err("model exploded".to_string()),
        ]);
        let t0 = Instant::now();

        uc.step(&frame(), t0).unwrap();
        uc.step(&frame(), t0 + Duration::from_secs(3)).unwrap();

        // Prior result set still drawn
        let presented = presented.lock().unwrap();
        assert_eq!(presented[1], presented[0]);
        let events = events.lock().unwrap();
        assert_eq!(events[1], "failed:model exploded");
    }

    #[test]
    fn test_analyzer_error_does_not_advance_timer() {
        let (mut uc, calls, _, _) = use_case_with(vec![
            Ok(AnalysisOutcome::Faces(Vec::new())),
            Err("transient".to_string()),
        ]);
        let t0 = Instant::now();

        uc.step(&frame(), t0).unwrap();
        let t1 = t0 + Duration::from_secs(3);
        uc.step(&frame(), t1).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // Timer still points at t0, so the very next iteration retries
        uc.step(&frame(), t1 + Duration::from_millis(1)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_replacement_is_wholesale_not_merged() {
        let (mut uc, _, _, _) = use_case_with(vec![
            Ok(AnalysisOutcome::Faces(vec![
                observation("happy"),
                observation("sad"),
            ])),
            Ok(AnalysisOutcome::Faces(vec![observation("neutral")])),
        ]);
        let t0 = Instant::now();

        uc.step(&frame(), t0).unwrap();
        assert_eq!(uc.observations().len(), 2);

        uc.step(&frame(), t0 + Duration::from_secs(3)).unwrap();
        assert_eq!(uc.observations().len(), 1);
        assert_eq!(uc.observations()[0].dominant_emotion, "neutral");
    }

    // --- run: loop termination and resource release ---

    #[test]
    fn test_quit_key_stops_loop_and_releases_once() {
        let (source, source_closes) =
            ScriptedSource::new(vec![Ok(Some(frame())), Ok(Some(frame())), Ok(Some(frame()))]);
        let (analyzer, _) = ScriptedAnalyzer::new(Vec::new());
        let (sink, presented, sink_closes) =
            RecordingSink::new(vec![Ok(KeyEvent::None), Ok(KeyEvent::Quit)]);
        let (reporter, events) = RecordingReporter::new();
        let mut uc = LiveAnnotationUseCase::new(
            Box::new(source),
            Box::new(analyzer),
            Box::new(sink),
            Box::new(reporter),
            Duration::from_secs(2),
        );

        let end = uc.run().unwrap();

        assert_eq!(end, LoopEnd::Quit);
        assert_eq!(presented.lock().unwrap().len(), 2);
        assert_eq!(source_closes.load(Ordering::SeqCst), 1);
        assert_eq!(sink_closes.load(Ordering::SeqCst), 1);
        assert!(!events.lock().unwrap().contains(&"capture_failed".to_string()));
    }

    #[test]
    fn test_source_exhaustion_ends_gracefully() {
        let (source, source_closes) = ScriptedSource::new(vec![Ok(Some(frame())), Ok(None)]);
        let (analyzer, _) = ScriptedAnalyzer::new(Vec::new());
        let (sink, presented, sink_closes) = RecordingSink::new(Vec::new());
        let (reporter, events) = RecordingReporter::new();
        let mut uc = LiveAnnotationUseCase::new(
            Box::new(source),
            Box::new(analyzer),
            Box::new(sink),
            Box::new(reporter),
            Duration::from_secs(2),
        );

        let end = uc.run().unwrap();

        assert_eq!(end, LoopEnd::SourceExhausted);
        assert_eq!(presented.lock().unwrap().len(), 1);
        assert_eq!(source_closes.load(Ordering::SeqCst), 1);
        assert_eq!(sink_closes.load(Ordering::SeqCst), 1);
        assert_eq!(events.lock().unwrap().last().unwrap(), "capture_failed");
    }

    #[test]
    fn test_grab_error_treated_as_exhaustion() {
        let (source, _) = ScriptedSource::new(vec![Err("device unplugged".to_string())]);
        let (analyzer, calls) = ScriptedAnalyzer::new(Vec::new());
        let (sink, _, _) = RecordingSink::new(Vec::new());
        let (reporter, events) = RecordingReporter::new();
        let mut uc = LiveAnnotationUseCase::new(
            Box::new(source),
            Box::new(analyzer),
            Box::new(sink),
            Box::new(reporter),
            Duration::from_secs(2),
        );

        let end = uc.run().unwrap();

        assert_eq!(end, LoopEnd::SourceExhausted);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(events.lock().unwrap().last().unwrap(), "capture_failed");
    }

    #[test]
    fn test_sink_error_propagates_but_still_releases() {
        let (source, source_closes) = ScriptedSource::new(vec![Ok(Some(frame()))]);
        let (analyzer, _) = ScriptedAnalyzer::new(Vec::new());
        let (sink, _, sink_closes) = RecordingSink::new(vec![Err("display gone".to_string())]);
        let (reporter, _) = RecordingReporter::new();
        let mut uc = LiveAnnotationUseCase::new(
            Box::new(source),
            Box::new(analyzer),
            Box::new(sink),
            Box::new(reporter),
            Duration::from_secs(2),
        );

        let result = uc.run();

        assert!(result.is_err());
        assert_eq!(source_closes.load(Ordering::SeqCst), 1);
        assert_eq!(sink_closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_status_lines_reported_per_successful_cycle() {
        let (source, _) = ScriptedSource::new(vec![Ok(Some(frame())), Ok(None)]);
        let (analyzer, _) = ScriptedAnalyzer::new(vec![Ok(AnalysisOutcome::Faces(vec![
            observation("happy"),
            observation("sad"),
        ]))]);
        let (sink, _, _) = RecordingSink::new(Vec::new());
        let (reporter, events) = RecordingReporter::new();
        let mut uc = LiveAnnotationUseCase::new(
            Box::new(source),
            Box::new(analyzer),
            Box::new(sink),
            Box::new(reporter),
            Duration::from_secs(2),
        );

        uc.run().unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events[0], "complete:2");
    }
}
