pub mod face;
pub mod translate;

pub use face::{
    expand_face_box, face_cropper_from_settings, largest_face, DetectorFaceCropper, FaceBox,
    FaceCropper, FaceDetector, NoFaceCropper,
};
#[cfg(feature = "face-detection")]
pub use face::SeetaFaceDetector;
pub use translate::{
    detect_language, translate_or_passthrough, PassthroughTranslator, TranslationService,
    Translator,
};
