// src/ai/prompts.rs
use clap::ValueEnum;
use std::fmt;

/// The four things a user can ask about an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum Feature {
    #[default]
    #[value(name = "scene")]
    SceneUnderstanding,
    #[value(name = "text")]
    TextToSpeech,
    #[value(name = "objects")]
    ObjectDetection,
    #[value(name = "assist")]
    PersonalizedAssistance,
}

/// Where a feature gets its text from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Ocr,
    Vision(&'static PromptTemplate),
}

/// Static instruction text sent alongside the image.
#[derive(Debug, PartialEq, Eq)]
pub struct PromptTemplate {
    pub id: &'static str,
    pub text: &'static str,
}

impl Feature {
    /// Selector order. The first entry is the default selection.
    pub const ALL: [Feature; 4] = [
        Feature::SceneUnderstanding,
        Feature::TextToSpeech,
        Feature::ObjectDetection,
        Feature::PersonalizedAssistance,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Feature::SceneUnderstanding => "Real-Time Scene Understanding",
            Feature::TextToSpeech => "Text-to-Speech Conversion",
            Feature::ObjectDetection => "Object Detection",
            Feature::PersonalizedAssistance => "Personalized Assistance",
        }
    }

    pub fn button_label(self) -> &'static str {
        match self {
            Feature::SceneUnderstanding => "🔍 Run Scene Understanding",
            Feature::TextToSpeech => "📝 Convert Text-to-Speech",
            Feature::ObjectDetection => "🕵 Run Object Detection",
            Feature::PersonalizedAssistance => "💡 Run Personalized Assistance",
        }
    }

    pub fn busy_message(self) -> &'static str {
        match self {
            Feature::SceneUnderstanding => "Analyzing the scene and converting the response to audio...",
            Feature::TextToSpeech => "Extracting text from the image and generating audio...",
            Feature::ObjectDetection => "Detecting the objects and generating audio...",
            Feature::PersonalizedAssistance => "Providing personalized guidance and generating audio...",
        }
    }

    /// Prefix for the message shown when this feature fails.
    pub fn failure_label(self) -> &'static str {
        match self {
            Feature::SceneUnderstanding => "Scene understanding failed",
            Feature::TextToSpeech => "Text extraction failed",
            Feature::ObjectDetection => "Object detection failed",
            Feature::PersonalizedAssistance => "Personalized assistance failed",
        }
    }

    pub fn source(self) -> Source {
        match self {
            Feature::SceneUnderstanding => Source::Vision(&SCENE_UNDERSTANDING),
            Feature::TextToSpeech => Source::Ocr,
            Feature::ObjectDetection => Source::Vision(&OBJECT_DETECTION),
            Feature::PersonalizedAssistance => Source::Vision(&PERSONALIZED_ASSISTANCE),
        }
    }

    /// Name used on the command line.
    pub fn cli_name(self) -> String {
        self.to_possible_value()
            .map(|v| v.get_name().to_string())
            .unwrap_or_default()
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub static SCENE_UNDERSTANDING: PromptTemplate = PromptTemplate {
    id: "scene-understanding",
    text: "You are a real-time scene interpreter for visually impaired users. Your task is to analyze and describe images vividly, empathetically, and without technical jargon. Focus on delivering concise, actionable information that enhances understanding and safety.

Description Guidelines:

Scene Overview: Summarize the setting (e.g., indoor/outdoor, type of location).
Key Objects & Layout: Describe objects with details like position, color, size, shape, and texture.
Activities & Interactions: Highlight actions or interactions (e.g., \"A person jogging with a dog\").
Mood & Atmosphere: Describe the tone (e.g., \"Lively with bright sunlight\").
Text & Symbols: Transcribe visible text or signs.
Sensory Details: Mention implied sounds, smells, or sensations.
Accessibility & Safety: Identify potential hazards or challenges (e.g., \"A step down near the doorway\").

Formatting Tips:

Use short, clear sentences.
Structure from general to specific details.
Maintain a neutral, empathetic tone.",
};

pub static OBJECT_DETECTION: PromptTemplate = PromptTemplate {
    id: "object-detection",
    text: "You are a visual accessibility specialist analyzing images to help visually impaired individuals navigate safely. Your goal is to provide detailed yet concise descriptions of visible objects and obstacles, prioritizing safety and situational awareness.

Guidelines:

Object and Obstacle Identification:
List all visible objects, obstacles, or features.
Highlight items critical for safety, such as steps, curbs, sharp edges, or spills.

Detailed Descriptions:
Describe each object/obstacle in terms of location (e.g., \"top left corner\"), size, and appearance (e.g., color, shape, texture).
Include distinguishing features for better visualization.

Safety Insights:
Explain the significance or purpose of each item.
For safety hazards, provide clear, actionable guidance (e.g., \"A low-hanging branch is at head height in the center of the path, duck to avoid it\").

Communication Style:

Use simple, accessible language. Avoid technical terms.
Incorporate directional terms and approximate measurements.
Maintain a calm, supportive tone to promote confidence and independence.
Use bullet points or numbered lists for clarity.",
};

pub static PERSONALIZED_ASSISTANCE: PromptTemplate = PromptTemplate {
    id: "personalized-assistance",
    text: "As an assistive technology specialist, your role is to provide personalized, context-specific support for visually impaired users. Deliver clear, actionable descriptions to empower users with confidence and enhance accessibility.

Tasks:

Identify and Describe Items:
List all objects, landmarks, or features visible in the image.
Provide concise descriptions of size, color, shape, position, and distinguishing attributes.

Interpret Text and Labels:
Transcribe visible text (e.g., signs, labels) accurately.
Explain the purpose or context (e.g., directions, warnings) for clarity.

Context-Specific Guidance:
Suggest practical actions based on the image (e.g., identifying products on a shelf).
Explain interactions between objects (e.g., \"The red button is below the green switch\").

Formatting and Tone:

Use clear, supportive language, avoiding jargon.
Organize information logically with bullet points or lists.
Acknowledge ambiguities transparently, offering the best interpretation where needed.",
};
