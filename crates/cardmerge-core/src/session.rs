//! Upload state for the two card sides.
//!
//! A [`Session`] owns the selected files together with their display
//! handles, and hands out [`ComposeRequest`]s whenever the combined
//! preview needs recomputing.  Every slot change advances a generation
//! token; a completed preview is only applied if its token is still
//! current, so the most recently started request always wins.
//!
//! Display handles are owned values.  Replacing a slot or clearing the
//! session drops the previous handle, which is where implementations
//! release the underlying resource (e.g. revoke a browser object URL).

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::{ComposeConfig, Limits, ProfileKind, ResolutionProfile};
use crate::decode::SourceFile;
use crate::encode::CompositeImage;
use crate::remote::ComposeOrder;
use crate::types::{ComposeError, Dimensions, Slot};

/// A renderable reference to an uploaded image.
pub trait DisplayHandle {
    /// Value usable as an image source.
    fn src(&self) -> &str;
}

/// One populated upload slot.
#[derive(Debug)]
struct UploadSlot<H> {
    file: SourceFile,
    display: H,
}

/// Yes/No answer of the phone-number selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PhoneNumber {
    /// Do not include the phone number.
    #[default]
    No,
    /// Include the phone number.
    Yes,
}

impl PhoneNumber {
    /// Both options in display order.
    pub const ALL: [Self; 2] = [Self::No, Self::Yes];

    /// Label shown in the selector.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::No => "No",
            Self::Yes => "Yes",
        }
    }

    /// Parse a selector value.
    #[must_use]
    pub fn from_label(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.label() == value)
    }
}

/// Snapshot of the form state at submit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormSubmission {
    /// Phone-number selection.
    pub phone_number: PhoneNumber,
    /// Name of the front file, if selected.
    pub front: Option<String>,
    /// Name of the back file, if selected.
    pub back: Option<String>,
}

/// Work order for one compositing run.
///
/// Carries copies of everything the compositor needs so it can run
/// detached from the session (e.g. in a spawned task).
#[derive(Debug, Clone)]
pub struct ComposeRequest {
    token: u64,
    kind: ProfileKind,
    front: SourceFile,
    back: SourceFile,
    profile: ResolutionProfile,
    limits: Limits,
}

impl ComposeRequest {
    /// Generation token the request was issued under.
    #[must_use]
    pub const fn token(&self) -> u64 {
        self.token
    }

    /// Preview or export.
    #[must_use]
    pub const fn kind(&self) -> ProfileKind {
        self.kind
    }

    /// Front source.
    #[must_use]
    pub const fn front(&self) -> &SourceFile {
        &self.front
    }

    /// Back source.
    #[must_use]
    pub const fn back(&self) -> &SourceFile {
        &self.back
    }

    /// Everything but the source bytes, for sending to a worker.
    #[must_use]
    pub fn order(&self) -> ComposeOrder {
        ComposeOrder {
            token: self.token,
            kind: self.kind,
            profile: self.profile.clone(),
            limits: self.limits,
        }
    }

    /// Run the compositor on the current thread.
    ///
    /// # Errors
    ///
    /// Returns the [`ComposeError`] from [`crate::compose`].
    pub fn run(&self) -> Result<CompositeImage, ComposeError> {
        info!(
            kind = ?self.kind,
            token = self.token,
            front = self.front.name(),
            back = self.back.name(),
            "composing"
        );
        crate::compose(
            self.front.bytes(),
            self.back.bytes(),
            &self.profile,
            &self.limits,
        )
    }
}

/// A preview composite ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPreview {
    image: CompositeImage,
    data_url: String,
    token: u64,
}

impl RenderedPreview {
    /// The encoded composite.
    #[must_use]
    pub const fn image(&self) -> &CompositeImage {
        &self.image
    }

    /// Data URL of the composite, computed once.
    #[must_use]
    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    /// Token of the request that produced it.
    #[must_use]
    pub const fn token(&self) -> u64 {
        self.token
    }
}

/// What [`Session::finish_preview`] did with a result.
#[derive(Debug)]
pub enum PreviewUpdate {
    /// The result replaced the displayed preview.
    Applied,
    /// The result belonged to a superseded request and was discarded.
    Stale,
    /// Compositing failed; the previous preview is kept.
    Failed(ComposeError),
}

/// A finished export ready to be offered for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    /// Download file name.
    pub file_name: String,
    /// Encoded image.
    pub image: CompositeImage,
}

/// Upload state manager for the front and back slots.
#[derive(Debug)]
pub struct Session<H> {
    config: ComposeConfig,
    front: Option<UploadSlot<H>>,
    back: Option<UploadSlot<H>>,
    generation: u64,
    preview: Option<Rc<RenderedPreview>>,
    phone_number: PhoneNumber,
}

impl<H> Default for Session<H> {
    fn default() -> Self {
        Self::new(ComposeConfig::default())
    }
}

impl<H> Session<H> {
    /// Create an empty session.
    #[must_use]
    pub const fn new(config: ComposeConfig) -> Self {
        Self {
            config,
            front: None,
            back: None,
            generation: 0,
            preview: None,
            phone_number: PhoneNumber::No,
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ComposeConfig {
        &self.config
    }

    /// Current generation token.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    const fn slot(&self, slot: Slot) -> Option<&UploadSlot<H>> {
        match slot {
            Slot::Front => self.front.as_ref(),
            Slot::Back => self.back.as_ref(),
        }
    }

    const fn slot_mut(&mut self, slot: Slot) -> &mut Option<UploadSlot<H>> {
        match slot {
            Slot::Front => &mut self.front,
            Slot::Back => &mut self.back,
        }
    }

    /// Store a new file for `slot`, releasing the previous handle.
    ///
    /// Returns a preview request when both slots are now populated.
    pub fn select_image(&mut self, slot: Slot, file: SourceFile, display: H) -> Option<ComposeRequest> {
        info!(
            %slot,
            name = file.name(),
            dimensions = %file.dimensions(),
            mime = file.mime_type(),
            "image selected"
        );
        let previous = self.slot_mut(slot).replace(UploadSlot { file, display });
        if let Some(previous) = previous {
            debug!(%slot, name = previous.file.name(), "releasing previous upload");
            drop(previous);
        }
        self.generation += 1;
        self.preview_request()
    }

    /// A preview request for the current slots, if both are populated.
    #[must_use]
    pub fn preview_request(&self) -> Option<ComposeRequest> {
        self.request(ProfileKind::Preview)
    }

    /// An export request, or `None` while either slot is empty.
    #[must_use]
    pub fn export_request(&self) -> Option<ComposeRequest> {
        self.request(ProfileKind::Export)
    }

    fn request(&self, kind: ProfileKind) -> Option<ComposeRequest> {
        let (front, back) = (self.front.as_ref()?, self.back.as_ref()?);
        Some(ComposeRequest {
            token: self.generation,
            kind,
            front: front.file.clone(),
            back: back.file.clone(),
            profile: self.config.profile(kind).clone(),
            limits: self.config.limits,
        })
    }

    /// Apply the outcome of a preview request.
    ///
    /// Results from superseded requests are discarded without touching
    /// the displayed preview.  Failures are logged here and keep the
    /// previous preview.
    pub fn finish_preview(
        &mut self,
        token: u64,
        outcome: Result<CompositeImage, ComposeError>,
    ) -> PreviewUpdate {
        if token != self.generation {
            debug!(token, current = self.generation, "discarding stale preview");
            return PreviewUpdate::Stale;
        }
        match outcome {
            Ok(image) => {
                info!(canvas = %image.dimensions(), token, "preview updated");
                let data_url = image.to_data_url();
                self.preview = Some(Rc::new(RenderedPreview {
                    image,
                    data_url,
                    token,
                }));
                PreviewUpdate::Applied
            }
            Err(e) => {
                error!(error = %e, token, "preview compose failed");
                PreviewUpdate::Failed(e)
            }
        }
    }

    /// Pair a finished export with the download file name.
    ///
    /// # Errors
    ///
    /// Passes through (and logs) the compose failure.
    pub fn finish_export(
        &self,
        outcome: Result<CompositeImage, ComposeError>,
    ) -> Result<ExportFile, ComposeError> {
        match outcome {
            Ok(image) => {
                info!(
                    canvas = %image.dimensions(),
                    file_name = %self.config.export_file_name,
                    "export ready"
                );
                Ok(ExportFile {
                    file_name: self.config.export_file_name.clone(),
                    image,
                })
            }
            Err(e) => {
                error!(error = %e, "export compose failed");
                Err(e)
            }
        }
    }

    /// The displayed preview, if any.
    #[must_use]
    pub fn preview(&self) -> Option<Rc<RenderedPreview>> {
        self.preview.clone()
    }

    /// Whether both slots are populated.
    #[must_use]
    pub const fn has_both(&self) -> bool {
        self.front.is_some() && self.back.is_some()
    }

    /// Name of the file in `slot`.
    #[must_use]
    pub fn file_name(&self, slot: Slot) -> Option<&str> {
        self.slot(slot).map(|s| s.file.name())
    }

    /// Header dimensions of the file in `slot`.
    #[must_use]
    pub fn dimensions(&self, slot: Slot) -> Option<Dimensions> {
        self.slot(slot).map(|s| s.file.dimensions())
    }

    /// Display handle of `slot`.
    #[must_use]
    pub fn display(&self, slot: Slot) -> Option<&H> {
        self.slot(slot).map(|s| &s.display)
    }

    /// Current phone-number selection.
    #[must_use]
    pub const fn phone_number(&self) -> PhoneNumber {
        self.phone_number
    }

    /// Update the phone-number selection.
    pub const fn set_phone_number(&mut self, value: PhoneNumber) {
        self.phone_number = value;
    }

    /// Snapshot of the form for the submit stub.
    #[must_use]
    pub fn submission(&self) -> FormSubmission {
        FormSubmission {
            phone_number: self.phone_number,
            front: self.file_name(Slot::Front).map(str::to_owned),
            back: self.file_name(Slot::Back).map(str::to_owned),
        }
    }

    /// Release both uploads and the preview.
    ///
    /// In-flight preview requests become stale.
    pub fn clear(&mut self) {
        debug!("clearing session");
        self.front = None;
        self.back = None;
        self.preview = None;
        self.generation += 1;
    }
}

impl<H: DisplayHandle> Session<H> {
    /// Image source for `slot`'s individual preview.
    #[must_use]
    pub fn display_src(&self, slot: Slot) -> Option<&str> {
        self.display(slot).map(DisplayHandle::src)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::cast_possible_truncation)]
mod tests {
    use std::cell::Cell;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    use super::*;

    /// Layer that counts ERROR-level events.
    struct ErrorCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for ErrorCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::ERROR {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    /// Run `f` with a subscriber installed and return how many errors it logged.
    fn errors_logged<R>(f: impl FnOnce() -> R) -> (R, usize) {
        let count = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(ErrorCounter(Arc::clone(&count)));
        let result = tracing::subscriber::with_default(subscriber, f);
        (result, count.load(Ordering::SeqCst))
    }

    /// Handle that counts how many times it has been released.
    struct CountingHandle {
        src: String,
        released: Rc<Cell<u32>>,
    }

    impl DisplayHandle for CountingHandle {
        fn src(&self) -> &str {
            &self.src
        }
    }

    impl Drop for CountingHandle {
        fn drop(&mut self) {
            self.released.set(self.released.get() + 1);
        }
    }

    fn handle(src: &str, released: &Rc<Cell<u32>>) -> CountingHandle {
        CountingHandle {
            src: src.to_owned(),
            released: Rc::clone(released),
        }
    }

    fn png_file(name: &str, width: u32, height: u32) -> SourceFile {
        let img = image::RgbaImage::from_fn(width, height, |x, _| {
            image::Rgba([(x % 256) as u8, 0, 0, 255])
        });
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        SourceFile::inspect(name, buf, &Limits::default()).unwrap()
    }

    fn small_config() -> ComposeConfig {
        ComposeConfig {
            preview: ResolutionProfile {
                target_height: 30,
                ..ResolutionProfile::preview()
            },
            export: ResolutionProfile {
                target_height: 60,
                ..ResolutionProfile::export()
            },
            ..ComposeConfig::default()
        }
    }

    #[test]
    fn empty_session_has_no_requests() {
        let session: Session<CountingHandle> = Session::default();
        assert!(!session.has_both());
        assert!(session.preview_request().is_none());
        assert!(session.export_request().is_none());
        assert!(session.preview().is_none());
    }

    #[test]
    fn one_slot_does_not_trigger_preview() {
        let released = Rc::new(Cell::new(0));
        let mut session = Session::new(small_config());
        let request = session.select_image(Slot::Front, png_file("f.png", 8, 6), handle("f", &released));
        assert!(request.is_none());
        assert!(session.export_request().is_none());
        assert_eq!(session.display_src(Slot::Front), Some("f"));
        assert_eq!(session.display_src(Slot::Back), None);
    }

    #[test]
    fn second_slot_triggers_preview_request() {
        let released = Rc::new(Cell::new(0));
        let mut session = Session::new(small_config());
        session.select_image(Slot::Front, png_file("f.png", 8, 6), handle("f", &released));
        let request = session
            .select_image(Slot::Back, png_file("b.png", 10, 5), handle("b", &released))
            .unwrap();
        assert_eq!(request.kind(), ProfileKind::Preview);
        assert_eq!(request.token(), session.generation());

        let outcome = request.run();
        assert!(matches!(
            session.finish_preview(request.token(), outcome),
            PreviewUpdate::Applied
        ));
        let preview = session.preview().unwrap();
        // 30 * 8 / 6 = 40 per box, plus 20 gutter.
        assert_eq!(preview.image().dimensions(), Dimensions::new(100, 30));
        assert!(preview.data_url().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn replacing_a_slot_releases_previous_handle_once() {
        let released = Rc::new(Cell::new(0));
        let mut session = Session::new(small_config());
        session.select_image(Slot::Front, png_file("a.png", 4, 4), handle("a", &released));
        session.select_image(Slot::Front, png_file("b.png", 4, 4), handle("b", &released));
        assert_eq!(released.get(), 1);
        assert_eq!(session.display_src(Slot::Front), Some("b"));
        assert_eq!(session.file_name(Slot::Front), Some("b.png"));
    }

    #[test]
    fn clear_and_drop_release_remaining_handles() {
        let released = Rc::new(Cell::new(0));
        let mut session = Session::new(small_config());
        session.select_image(Slot::Front, png_file("a.png", 4, 4), handle("a", &released));
        session.select_image(Slot::Back, png_file("b.png", 4, 4), handle("b", &released));
        session.clear();
        assert_eq!(released.get(), 2);
        assert!(session.export_request().is_none());

        session.select_image(Slot::Back, png_file("c.png", 4, 4), handle("c", &released));
        drop(session);
        assert_eq!(released.get(), 3);
    }

    #[test]
    fn reselecting_front_replaces_composite() {
        let released = Rc::new(Cell::new(0));
        let mut session = Session::new(small_config());
        session.select_image(Slot::Front, png_file("f1.png", 8, 6), handle("f1", &released));
        let first = session
            .select_image(Slot::Back, png_file("b.png", 6, 6), handle("b", &released))
            .unwrap();
        session.finish_preview(first.token(), first.run());
        let first_preview = session.preview().unwrap();

        // New front is square: box becomes 30x30.
        let second = session
            .select_image(Slot::Front, png_file("f2.png", 5, 5), handle("f2", &released))
            .unwrap();
        assert!(second.token() > first.token());
        assert!(matches!(
            session.finish_preview(second.token(), second.run()),
            PreviewUpdate::Applied
        ));
        let second_preview = session.preview().unwrap();
        assert!(!Rc::ptr_eq(&first_preview, &second_preview));
        assert_eq!(second_preview.image().dimensions(), Dimensions::new(80, 30));
    }

    #[test]
    fn stale_result_is_discarded() {
        let released = Rc::new(Cell::new(0));
        let mut session = Session::new(small_config());
        session.select_image(Slot::Front, png_file("f.png", 8, 6), handle("f", &released));
        let old = session
            .select_image(Slot::Back, png_file("b1.png", 6, 6), handle("b1", &released))
            .unwrap();
        let new = session
            .select_image(Slot::Back, png_file("b2.png", 6, 6), handle("b2", &released))
            .unwrap();

        // The newer request finishes first; the older one must not win.
        assert!(matches!(
            session.finish_preview(new.token(), new.run()),
            PreviewUpdate::Applied
        ));
        let applied = session.preview().unwrap();
        assert!(matches!(
            session.finish_preview(old.token(), old.run()),
            PreviewUpdate::Stale
        ));
        assert_eq!(session.preview().unwrap().token(), applied.token());
    }

    #[test]
    fn failure_keeps_previous_preview() {
        let released = Rc::new(Cell::new(0));
        let mut session = Session::new(small_config());
        session.select_image(Slot::Front, png_file("f.png", 8, 6), handle("f", &released));
        let ok = session
            .select_image(Slot::Back, png_file("b.png", 6, 6), handle("b", &released))
            .unwrap();
        session.finish_preview(ok.token(), ok.run());
        let before = session.preview().unwrap();

        let failing = session
            .select_image(Slot::Back, png_file("b2.png", 6, 6), handle("b2", &released))
            .unwrap();
        let outcome = Err(ComposeError::Decode {
            slot: Slot::Back,
            source: crate::types::DecodeError::EmptyInput,
        });
        let update = session.finish_preview(failing.token(), outcome);
        assert!(matches!(update, PreviewUpdate::Failed(ref e) if e.slot() == Some(Slot::Back)));
        assert!(Rc::ptr_eq(&before, &session.preview().unwrap()));
    }

    #[test]
    fn export_request_uses_export_profile_and_file_name() {
        let released = Rc::new(Cell::new(0));
        let mut session = Session::new(small_config());
        session.select_image(Slot::Front, png_file("f.png", 8, 6), handle("f", &released));
        session.select_image(Slot::Back, png_file("b.png", 10, 5), handle("b", &released));

        let request = session.export_request().unwrap();
        assert_eq!(request.kind(), ProfileKind::Export);
        let file = session.finish_export(request.run()).unwrap();
        assert_eq!(file.file_name, "aadhaar-card.png");
        // 60 * 8 / 6 = 80 per box, no gutter.
        assert_eq!(file.image.dimensions(), Dimensions::new(160, 60));
        assert!(file.image.layout().divider.is_none());
    }

    #[test]
    fn export_failure_is_passed_through() {
        let session: Session<CountingHandle> = Session::new(small_config());
        let result = session.finish_export(Err(ComposeError::Layout("too wide".into())));
        assert!(matches!(result, Err(ComposeError::Layout(_))));
    }

    #[test]
    fn failed_preview_is_logged_exactly_once() {
        let released = Rc::new(Cell::new(0));
        let mut session = Session::new(small_config());
        session.select_image(Slot::Front, png_file("f.png", 8, 6), handle("f", &released));
        let request = session
            .select_image(Slot::Back, png_file("b.png", 6, 6), handle("b", &released))
            .unwrap();

        let (update, errors) = errors_logged(|| {
            session.finish_preview(
                request.token(),
                Err(ComposeError::Layout("canvas too wide".into())),
            )
        });
        assert!(matches!(update, PreviewUpdate::Failed(_)));
        assert_eq!(errors, 1);
    }

    #[test]
    fn stale_failure_is_not_logged_as_error() {
        let released = Rc::new(Cell::new(0));
        let mut session = Session::new(small_config());
        session.select_image(Slot::Front, png_file("f.png", 8, 6), handle("f", &released));
        let old = session
            .select_image(Slot::Back, png_file("b1.png", 6, 6), handle("b1", &released))
            .unwrap();
        session.select_image(Slot::Back, png_file("b2.png", 6, 6), handle("b2", &released));

        let (update, errors) = errors_logged(|| {
            session.finish_preview(old.token(), Err(ComposeError::Layout("late".into())))
        });
        assert!(matches!(update, PreviewUpdate::Stale));
        assert_eq!(errors, 0);
    }

    #[test]
    fn failed_export_is_logged_exactly_once() {
        let session: Session<CountingHandle> = Session::new(small_config());
        let (result, errors) = errors_logged(|| {
            session.finish_export(Err(ComposeError::InvalidProfile("zero height".into())))
        });
        assert!(result.is_err());
        assert_eq!(errors, 1);
    }

    #[test]
    fn worker_reported_failure_is_logged_exactly_once() {
        let released = Rc::new(Cell::new(0));
        let mut session = Session::new(small_config());
        session.select_image(Slot::Front, png_file("f.png", 8, 6), handle("f", &released));
        let request = session
            .select_image(Slot::Back, png_file("b.png", 6, 6), handle("b", &released))
            .unwrap();
        let (reply, png) = request.order().execute(request.front().bytes(), b"not an image");

        let (update, errors) = errors_logged(|| {
            session.finish_preview(request.token(), reply.into_result(png))
        });
        assert!(matches!(&update, PreviewUpdate::Failed(e) if e.slot() == Some(Slot::Back)));
        assert_eq!(errors, 1);
    }

    #[test]
    fn successful_export_logs_no_error() {
        let released = Rc::new(Cell::new(0));
        let mut session = Session::new(small_config());
        session.select_image(Slot::Front, png_file("f.png", 8, 6), handle("f", &released));
        session.select_image(Slot::Back, png_file("b.png", 10, 5), handle("b", &released));
        let request = session.export_request().unwrap();

        let (result, errors) = errors_logged(|| session.finish_export(request.run()));
        assert!(result.is_ok());
        assert_eq!(errors, 0);
    }

    #[test]
    fn submission_reflects_form_state() {
        let released = Rc::new(Cell::new(0));
        let mut session = Session::new(small_config());
        session.select_image(Slot::Back, png_file("back.png", 4, 4), handle("b", &released));
        session.set_phone_number(PhoneNumber::Yes);
        assert_eq!(
            session.submission(),
            FormSubmission {
                phone_number: PhoneNumber::Yes,
                front: None,
                back: Some("back.png".into()),
            }
        );
    }

    #[test]
    fn phone_number_labels_round_trip() {
        for value in PhoneNumber::ALL {
            assert_eq!(PhoneNumber::from_label(value.label()), Some(value));
        }
        assert_eq!(PhoneNumber::from_label("maybe"), None);
    }
}
