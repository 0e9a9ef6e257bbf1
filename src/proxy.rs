//! The proxy engine: request-scoped engine selection plus forwarding.
//!
//! [`ProxyEngine`] owns every configured engine and implements [`Engine`]
//! itself. Each cycle starts at [`load`](Engine::load), which picks one
//! engine through the [selection policy](crate::selection) and memoizes it.
//! Every later call is forwarded verbatim to that engine until the next
//! `load`. [`read`](Engine::read) also closes the cycle's timing.
//!
//! ```text
//! Uninitialized --load--> Selected --read--> Done
//!       |                    |                 |
//!       +------load (no match)-------> Failed  |
//!                                              |
//!       any state --load--> fresh cycle <------+
//! ```
//!
//! A proxy is owned by one in-flight request at a time. It can be reused by
//! sequential requests; nothing from a previous cycle survives a `load`.

use crate::context::RequestContext;
use crate::imaging::{ApplicabilityTest, Dimensions, Engine, EngineError, Quality};
use crate::instrument::{self, Clock, SystemClock};
use crate::registry::{EngineRegistry, RegistryError};
use crate::selection::{self, Candidate};
use image::DynamicImage;
use std::time::Instant;
use tracing::warn;

/// Where the proxy is in the current request cycle.
#[derive(Debug, Clone)]
enum Cycle {
    Uninitialized,
    Failed { attempted: Vec<String> },
    Selected { index: usize, started: Instant },
    Done { index: usize, started: Instant },
}

pub struct ProxyEngine {
    candidates: Vec<Candidate>,
    context: RequestContext,
    clock: Box<dyn Clock>,
    cycle: Cycle,
}

impl ProxyEngine {
    pub fn new(candidates: Vec<Candidate>, context: RequestContext) -> Self {
        Self {
            candidates,
            context,
            clock: Box::new(SystemClock),
            cycle: Cycle::Uninitialized,
        }
    }

    /// Build every engine listed in the context's config, in order.
    pub fn from_registry(
        registry: &EngineRegistry,
        context: RequestContext,
    ) -> Result<Self, RegistryError> {
        let candidates = registry.instantiate(&context.config)?;
        Ok(Self::new(candidates, context))
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Identifier of the engine serving the current cycle, if one was selected.
    pub fn selected(&self) -> Option<&str> {
        match self.cycle {
            Cycle::Selected { index, .. } | Cycle::Done { index, .. } => {
                Some(&self.candidates[index].id)
            }
            Cycle::Uninitialized | Cycle::Failed { .. } => None,
        }
    }

    pub fn candidate_ids(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.id.as_str()).collect()
    }

    /// Index of the selected candidate and when its cycle started.
    fn selection(&self) -> Result<(usize, Instant), EngineError> {
        match &self.cycle {
            Cycle::Selected { index, started } | Cycle::Done { index, started } => {
                Ok((*index, *started))
            }
            Cycle::Uninitialized => Err(EngineError::UninitializedDispatch),
            Cycle::Failed { attempted } => Err(EngineError::SelectionFailed {
                attempted: attempted.clone(),
            }),
        }
    }

    fn selected_index(&self) -> Result<usize, EngineError> {
        self.selection().map(|(index, _)| index)
    }

    fn active(&self) -> Result<&dyn Engine, EngineError> {
        let index = self.selected_index()?;
        Ok(self.candidates[index].engine.as_ref())
    }

    fn active_mut(&mut self) -> Result<&mut dyn Engine, EngineError> {
        let index = self.selected_index()?;
        Ok(self.candidates[index].engine.as_mut())
    }
}

impl Engine for ProxyEngine {
    /// The proxy never claims a payload itself.
    fn applicability(&self) -> Option<&dyn ApplicabilityTest> {
        None
    }

    fn load(&mut self, buffer: &[u8], extension: &str) -> Result<(), EngineError> {
        let started = self.clock.now();
        self.cycle = Cycle::Uninitialized;

        let index = match selection::select(&self.candidates, extension, buffer) {
            Ok(index) => index,
            Err(err) => {
                if let EngineError::SelectionFailed { attempted } = &err {
                    warn!(?attempted, extension, "no engine accepted the payload");
                    self.cycle = Cycle::Failed {
                        attempted: attempted.clone(),
                    };
                }
                return Err(err);
            }
        };
        self.cycle = Cycle::Selected { index, started };

        let candidate = &mut self.candidates[index];
        self.context
            .headers
            .set_header(&self.context.config.headers.engine, &candidate.id);
        candidate.engine.load(buffer, extension)
    }

    fn read(
        &mut self,
        extension: Option<&str>,
        quality: Option<Quality>,
    ) -> Result<Vec<u8>, EngineError> {
        let (index, started) = self.selection()?;
        let output = self.candidates[index].engine.read(extension, quality)?;

        let millis = instrument::elapsed_millis(started, self.clock.now());
        instrument::report_processing_time(&self.context, &self.candidates[index].id, millis);
        self.cycle = Cycle::Done { index, started };
        Ok(output)
    }

    fn create_image(&self, buffer: &[u8]) -> Result<DynamicImage, EngineError> {
        self.active()?.create_image(buffer)
    }

    fn crop(
        &mut self,
        left: u32,
        top: u32,
        right: u32,
        bottom: u32,
    ) -> Result<(), EngineError> {
        self.active_mut()?.crop(left, top, right, bottom)
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), EngineError> {
        self.active_mut()?.resize(width, height)
    }

    fn image_data(&mut self, update_image: bool) -> Result<Vec<u8>, EngineError> {
        self.active_mut()?.image_data(update_image)
    }

    fn set_image_data(&mut self, data: &[u8]) -> Result<(), EngineError> {
        self.active_mut()?.set_image_data(data)
    }

    fn size(&self) -> Result<Dimensions, EngineError> {
        self.active()?.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TimingSample;
    use crate::imaging::backend::tests::{MockEngine, MockHandle, RecordedOp};
    use crate::test_helpers::{ManualClock, recording_context};
    use std::time::Duration;

    /// Registry `[svg: ".svg", webp: ".webp", pil: fallback]` with handles
    /// onto each mock's log.
    fn svg_webp_pil() -> (Vec<Candidate>, [MockHandle; 3]) {
        let svg = MockEngine::for_extension("svg", ".svg");
        let webp = MockEngine::for_extension("webp", ".webp");
        let pil = MockEngine::fallback("pil");
        let handles = [svg.handle(), webp.handle(), pil.handle()];
        let candidates = vec![
            Candidate::new("svg", Box::new(svg)),
            Candidate::new("webp", Box::new(webp)),
            Candidate::new("pil", Box::new(pil)),
        ];
        (candidates, handles)
    }

    #[test]
    fn selects_by_extension_in_order() {
        for (extension, expected) in [(".webp", "webp"), (".png", "pil"), (".svg", "svg")] {
            let (candidates, _) = svg_webp_pil();
            let (context, headers, _) = recording_context();
            let mut proxy = ProxyEngine::new(candidates, context);

            proxy.load(b"payload", extension).unwrap();
            assert_eq!(proxy.selected(), Some(expected));
            assert_eq!(headers.get("Engine").as_deref(), Some(expected));
        }
    }

    #[test]
    fn load_is_forwarded_with_identical_arguments() {
        let (candidates, [_, webp, pil]) = svg_webp_pil();
        let (context, _, _) = recording_context();
        let mut proxy = ProxyEngine::new(candidates, context);

        proxy.load(b"12345", ".webp").unwrap();
        assert_eq!(
            webp.forwarded(),
            vec![RecordedOp::Load {
                extension: ".webp".into(),
                bytes: 5,
            }]
        );
        assert!(pil.operations().is_empty());
    }

    #[test]
    fn no_match_fails_load_and_every_later_operation() {
        let candidates = vec![
            Candidate::new("svg", Box::new(MockEngine::for_extension("svg", ".svg"))),
            Candidate::new("webp", Box::new(MockEngine::for_extension("webp", ".webp"))),
        ];
        let (context, headers, _) = recording_context();
        let mut proxy = ProxyEngine::new(candidates, context);

        let expected = vec!["svg".to_string(), "webp".to_string()];
        assert!(matches!(
            proxy.load(b"x", ".png"),
            Err(EngineError::SelectionFailed { attempted }) if attempted == expected
        ));
        assert!(matches!(
            proxy.resize(10, 10),
            Err(EngineError::SelectionFailed { attempted }) if attempted == expected
        ));
        assert!(matches!(
            proxy.read(None, None),
            Err(EngineError::SelectionFailed { .. })
        ));
        assert!(matches!(proxy.size(), Err(EngineError::SelectionFailed { .. })));
        assert_eq!(proxy.selected(), None);
        assert_eq!(headers.get("Engine"), None);
    }

    #[test]
    fn applicability_tests_run_once_per_cycle() {
        let (candidates, [svg, webp, pil]) = svg_webp_pil();
        let (context, _, _) = recording_context();
        let mut proxy = ProxyEngine::new(candidates, context);

        proxy.load(b"x", ".png").unwrap();
        proxy.resize(100, 100).unwrap();
        proxy.crop(0, 0, 50, 50).unwrap();
        proxy.size().unwrap();
        proxy.image_data(true).unwrap();
        proxy.read(None, None).unwrap();

        assert_eq!(svg.should_run_calls(), 1);
        assert_eq!(webp.should_run_calls(), 1);
        // The fallback has no test to call.
        assert_eq!(pil.should_run_calls(), 0);
    }

    #[test]
    fn processing_time_reported_as_metric_and_header() {
        let (candidates, _) = svg_webp_pil();
        let (context, headers, metrics) = recording_context();
        let clock = ManualClock::new();
        let mut proxy = ProxyEngine::new(candidates, context).with_clock(clock.clone());

        proxy.load(b"x", ".webp").unwrap();
        clock.advance(Duration::from_millis(125));
        proxy.read(None, None).unwrap();

        assert_eq!(
            metrics.samples(),
            vec![TimingSample {
                name: "engine.process_time.webp".into(),
                millis: 125,
            }]
        );
        assert_eq!(headers.get("ProcessingTime").as_deref(), Some("125"));
    }

    #[test]
    fn clock_going_backwards_reports_zero() {
        let (candidates, _) = svg_webp_pil();
        let (context, headers, metrics) = recording_context();
        let clock = ManualClock::new();
        let mut proxy = ProxyEngine::new(candidates, context).with_clock(clock.clone());

        proxy.load(b"x", ".png").unwrap();
        clock.rewind(Duration::from_millis(40));
        proxy.read(None, None).unwrap();

        assert_eq!(metrics.samples()[0].millis, 0);
        assert_eq!(headers.get("ProcessingTime").as_deref(), Some("0"));
    }

    #[test]
    fn failed_read_is_not_timed() {
        let candidates = vec![Candidate::new(
            "pil",
            Box::new(MockEngine::fallback("pil").failing_reads()),
        )];
        let (context, headers, metrics) = recording_context();
        let mut proxy = ProxyEngine::new(candidates, context);

        proxy.load(b"x", ".png").unwrap();
        assert!(matches!(
            proxy.read(None, None),
            Err(EngineError::UnsupportedFormat(msg)) if msg == "mock"
        ));
        assert!(metrics.samples().is_empty());
        assert_eq!(headers.get("ProcessingTime"), None);
    }

    #[test]
    fn sequential_cycles_leave_no_residue() {
        let (candidates, [svg, webp, _]) = svg_webp_pil();
        let (context, headers, metrics) = recording_context();
        let mut proxy = ProxyEngine::new(candidates, context);

        proxy.load(b"x", ".svg").unwrap();
        proxy.read(None, None).unwrap();
        let svg_ops_after_first_cycle = svg.forwarded().len();

        proxy.load(b"y", ".webp").unwrap();
        proxy.resize(10, 10).unwrap();
        proxy.read(Some(".png"), Some(Quality::new(70))).unwrap();

        assert_eq!(proxy.selected(), Some("webp"));
        assert_eq!(svg.forwarded().len(), svg_ops_after_first_cycle);
        assert_eq!(
            webp.forwarded(),
            vec![
                RecordedOp::Load {
                    extension: ".webp".into(),
                    bytes: 1,
                },
                RecordedOp::Resize {
                    width: 10,
                    height: 10,
                },
                RecordedOp::Read {
                    extension: Some(".png".into()),
                    quality: Some(70),
                },
            ]
        );
        assert_eq!(headers.get("Engine").as_deref(), Some("webp"));
        let names: Vec<String> = metrics.samples().into_iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec!["engine.process_time.svg", "engine.process_time.webp"]
        );
    }

    #[test]
    fn failed_selection_after_success_clears_previous_engine() {
        let candidates = vec![Candidate::new(
            "svg",
            Box::new(MockEngine::for_extension("svg", ".svg")),
        )];
        let (context, _, _) = recording_context();
        let mut proxy = ProxyEngine::new(candidates, context);

        proxy.load(b"x", ".svg").unwrap();
        assert!(proxy.load(b"x", ".png").is_err());
        assert_eq!(proxy.selected(), None);
        assert!(matches!(
            proxy.resize(1, 1),
            Err(EngineError::SelectionFailed { .. })
        ));
    }

    #[test]
    fn forwarding_matches_direct_calls() {
        let (candidates, [_, webp, _]) = svg_webp_pil();
        let (context, _, _) = recording_context();
        let mut proxy = ProxyEngine::new(candidates, context);

        let mut direct = MockEngine::for_extension("webp", ".webp");
        let direct_log = direct.handle();

        proxy.load(b"x", ".webp").unwrap();
        direct.load(b"x", ".webp").unwrap();

        proxy.resize(100, 100).unwrap();
        direct.resize(100, 100).unwrap();
        proxy.crop(1, 2, 30, 40).unwrap();
        direct.crop(1, 2, 30, 40).unwrap();
        proxy.set_image_data(&[1, 2, 3]).unwrap();
        direct.set_image_data(&[1, 2, 3]).unwrap();

        assert_eq!(webp.forwarded(), direct_log.forwarded());
        assert_eq!(proxy.size().unwrap(), direct.size().unwrap());
        assert_eq!(
            proxy.image_data(false).unwrap(),
            direct.image_data(false).unwrap()
        );
        assert_eq!(
            proxy.read(None, None).unwrap(),
            direct.read(None, None).unwrap()
        );
        assert_eq!(
            proxy.create_image(b"abc").unwrap().width(),
            direct.create_image(b"abc").unwrap().width()
        );
    }

    #[test]
    fn engine_errors_pass_through_unmodified() {
        let (candidates, _) = svg_webp_pil();
        let (context, _, _) = recording_context();
        let mut proxy = ProxyEngine::new(candidates, context);

        proxy.load(b"x", ".png").unwrap();
        // The mock's crop never fails; its size reflects the region.
        proxy.crop(10, 10, 20, 30).unwrap();
        assert_eq!(
            proxy.size().unwrap(),
            Dimensions {
                width: 10,
                height: 20,
            }
        );

        let candidates = vec![Candidate::new(
            "raster",
            Box::new(crate::imaging::RasterEngine::default()) as Box<dyn Engine>,
        )];
        let (context, headers, _) = recording_context();
        let mut proxy = ProxyEngine::new(candidates, context);
        assert!(matches!(
            proxy.load(b"not an image", ".png"),
            Err(EngineError::Decode { .. })
        ));
        // The selection stands even though the engine could not decode.
        assert_eq!(proxy.selected(), Some("raster"));
        assert_eq!(headers.get("Engine").as_deref(), Some("raster"));
        assert!(matches!(proxy.size(), Err(EngineError::NotLoaded)));
    }

    #[test]
    fn operations_before_first_load_are_uninitialized() {
        let (candidates, handles) = svg_webp_pil();
        let (context, _, _) = recording_context();
        let mut proxy = ProxyEngine::new(candidates, context);

        assert!(matches!(proxy.read(None, None), Err(EngineError::UninitializedDispatch)));
        assert!(matches!(proxy.resize(1, 1), Err(EngineError::UninitializedDispatch)));
        assert!(matches!(proxy.crop(0, 0, 1, 1), Err(EngineError::UninitializedDispatch)));
        assert!(matches!(proxy.size(), Err(EngineError::UninitializedDispatch)));
        assert!(matches!(
            proxy.image_data(true),
            Err(EngineError::UninitializedDispatch)
        ));
        assert!(matches!(
            proxy.set_image_data(&[]),
            Err(EngineError::UninitializedDispatch)
        ));
        assert!(matches!(
            proxy.create_image(b""),
            Err(EngineError::UninitializedDispatch)
        ));
        assert!(handles.iter().all(|h| h.operations().is_empty()));
    }

    #[test]
    fn proxy_has_no_applicability_test() {
        let (candidates, _) = svg_webp_pil();
        let (context, _, _) = recording_context();
        let proxy = ProxyEngine::new(candidates, context);
        assert!(proxy.applicability().is_none());
        assert_eq!(proxy.candidate_ids(), vec!["svg", "webp", "pil"]);
    }

    #[test]
    fn from_registry_builds_configured_engines() {
        let (context, _, _) = recording_context();
        let proxy = ProxyEngine::from_registry(&EngineRegistry::builtin(), context).unwrap();
        assert_eq!(proxy.candidate_ids(), vec!["gif", "large", "raster"]);
    }

    #[test]
    fn read_after_done_reports_again_from_same_start() {
        let (candidates, _) = svg_webp_pil();
        let (context, _, metrics) = recording_context();
        let clock = ManualClock::new();
        let mut proxy = ProxyEngine::new(candidates, context).with_clock(clock.clone());

        proxy.load(b"x", ".png").unwrap();
        clock.advance(Duration::from_millis(10));
        proxy.read(None, None).unwrap();
        clock.advance(Duration::from_millis(5));
        proxy.read(Some(".jpg"), None).unwrap();

        let millis: Vec<u64> = metrics.samples().into_iter().map(|s| s.millis).collect();
        assert_eq!(millis, vec![10, 15]);
    }
}
