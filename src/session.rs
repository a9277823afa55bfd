// src/session.rs
use std::sync::Arc;
use thiserror::Error;

use crate::ai::prompts::Feature;
use crate::assist::Outcome;
use crate::upload::UploadedImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NoImage,
    ImageLoaded,
    FeatureSelected,
    Processing,
    ResultShown,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::NoImage => "Waiting for an image",
            Phase::ImageLoaded => "Image loaded",
            Phase::FeatureSelected => "Ready",
            Phase::Processing => "Working...",
            Phase::ResultShown => "Done",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Please Upload Image to Proceed...!")]
    NoImage,

    #[error("Still working on the previous request")]
    Busy,

    #[error("No request is in progress")]
    NotProcessing,
}

/// One user's interaction state. Holds at most one image, one feature
/// selection and one result.
#[derive(Debug)]
pub struct Session {
    phase: Phase,
    feature: Feature,
    image: Option<Arc<UploadedImage>>,
    result: Option<Outcome>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            phase: Phase::NoImage,
            feature: Feature::default(),
            image: None,
            result: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn feature(&self) -> Feature {
        self.feature
    }

    pub fn image(&self) -> Option<&Arc<UploadedImage>> {
        self.image.as_ref()
    }

    pub fn result(&self) -> Option<&Outcome> {
        self.result.as_ref()
    }

    pub fn is_processing(&self) -> bool {
        self.phase == Phase::Processing
    }

    /// Replace the current image. Any shown result belongs to the old image
    /// and is dropped.
    pub fn load_image(&mut self, image: UploadedImage) -> Result<(), SessionError> {
        if self.is_processing() {
            return Err(SessionError::Busy);
        }
        self.image = Some(Arc::new(image));
        self.result = None;
        self.phase = Phase::ImageLoaded;
        Ok(())
    }

    pub fn select_feature(&mut self, feature: Feature) -> Result<(), SessionError> {
        if self.is_processing() {
            return Err(SessionError::Busy);
        }
        if feature == self.feature && self.phase != Phase::ImageLoaded {
            return Ok(());
        }
        self.feature = feature;
        if self.image.is_some() {
            self.result = None;
            self.phase = Phase::FeatureSelected;
        }
        Ok(())
    }

    /// Start the selected feature. Returns what the worker needs.
    pub fn confirm(&mut self) -> Result<(Feature, Arc<UploadedImage>), SessionError> {
        if self.is_processing() {
            return Err(SessionError::Busy);
        }
        let image = self.image.clone().ok_or(SessionError::NoImage)?;
        self.result = None;
        self.phase = Phase::Processing;
        Ok((self.feature, image))
    }

    pub fn finish(&mut self, outcome: Outcome) -> Result<(), SessionError> {
        if !self.is_processing() {
            return Err(SessionError::NotProcessing);
        }
        self.result = Some(outcome);
        self.phase = Phase::ResultShown;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assist::tests::{assistant, image, Calls};

    fn outcome(feature: Feature) -> Outcome {
        let calls = Arc::new(Calls::default());
        assistant(&calls, Ok("A bus stop."), "EXIT", false).run(feature, &image())
    }

    #[test]
    fn starts_without_image_on_first_feature() {
        let session = Session::new();
        assert_eq!(session.phase(), Phase::NoImage);
        assert_eq!(session.feature(), Feature::SceneUnderstanding);
        assert!(session.image().is_none());
    }

    #[test]
    fn confirm_needs_an_image() {
        let mut session = Session::new();
        assert_eq!(session.confirm().unwrap_err(), SessionError::NoImage);
        assert_eq!(session.phase(), Phase::NoImage);
    }

    #[test]
    fn selecting_before_upload_keeps_no_image() {
        let mut session = Session::new();
        session.select_feature(Feature::ObjectDetection).unwrap();
        assert_eq!(session.phase(), Phase::NoImage);
        assert_eq!(session.feature(), Feature::ObjectDetection);
    }

    #[test]
    fn full_cycle() {
        let mut session = Session::new();
        session.load_image(image()).unwrap();
        assert_eq!(session.phase(), Phase::ImageLoaded);

        session.select_feature(Feature::TextToSpeech).unwrap();
        assert_eq!(session.phase(), Phase::FeatureSelected);

        let (feature, img) = session.confirm().unwrap();
        assert_eq!(feature, Feature::TextToSpeech);
        assert_eq!(img.name, "street.png");
        assert_eq!(session.phase(), Phase::Processing);

        session.finish(outcome(feature)).unwrap();
        assert_eq!(session.phase(), Phase::ResultShown);
        assert!(session.result().is_some());

        // Confirm again from ResultShown
        session.confirm().unwrap();
        assert!(session.result().is_none());
        assert_eq!(session.phase(), Phase::Processing);
    }

    #[test]
    fn default_feature_can_be_confirmed_without_selecting() {
        let mut session = Session::new();
        session.load_image(image()).unwrap();
        let (feature, _) = session.confirm().unwrap();
        assert_eq!(feature, Feature::SceneUnderstanding);
    }

    #[test]
    fn only_one_request_in_flight() {
        let mut session = Session::new();
        session.load_image(image()).unwrap();
        session.confirm().unwrap();

        assert_eq!(session.confirm().unwrap_err(), SessionError::Busy);
        assert_eq!(session.load_image(image()).unwrap_err(), SessionError::Busy);
        assert_eq!(
            session.select_feature(Feature::ObjectDetection).unwrap_err(),
            SessionError::Busy
        );
        assert_eq!(session.feature(), Feature::SceneUnderstanding);
    }

    #[test]
    fn reupload_clears_result() {
        let mut session = Session::new();
        session.load_image(image()).unwrap();
        let (feature, _) = session.confirm().unwrap();
        session.finish(outcome(feature)).unwrap();

        session.load_image(image()).unwrap();
        assert!(session.result().is_none());
        assert_eq!(session.phase(), Phase::ImageLoaded);
    }

    #[test]
    fn reselecting_feature_clears_result() {
        let mut session = Session::new();
        session.load_image(image()).unwrap();
        let (feature, _) = session.confirm().unwrap();
        session.finish(outcome(feature)).unwrap();

        session.select_feature(Feature::PersonalizedAssistance).unwrap();
        assert!(session.result().is_none());
        assert_eq!(session.phase(), Phase::FeatureSelected);
    }

    #[test]
    fn reselecting_same_feature_keeps_result() {
        let mut session = Session::new();
        session.load_image(image()).unwrap();
        let (feature, _) = session.confirm().unwrap();
        session.finish(outcome(feature)).unwrap();

        session.select_feature(feature).unwrap();
        assert!(session.result().is_some());
    }

    #[test]
    fn finish_without_request_is_rejected() {
        let mut session = Session::new();
        assert_eq!(
            session.finish(outcome(Feature::SceneUnderstanding)).unwrap_err(),
            SessionError::NotProcessing
        );
    }
}
