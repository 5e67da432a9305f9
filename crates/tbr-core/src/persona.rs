//! Persona registry: six fixed model personas for the enrichment pipeline.
//!
//! Each persona pairs a system instruction with fixed decoding parameters
//! (temperature 0.3, seed 42) so repeated runs over identical prompts sample
//! the same way. Personas become usable agents only after a one-time
//! registration against the backend (see `backend::Agent`).

/// Sampling temperature shared by every persona. Low for determinism-leaning output.
pub const PERSONA_TEMPERATURE: f32 = 0.3;
/// Fixed sampling seed shared by every persona, for reproducibility across runs.
pub const PERSONA_SEED: u32 = 42;

// ---------------------------------------------------------------------------
// BaseModel: the Ollama models the personas can be built FROM
// ---------------------------------------------------------------------------

/// Known-good base models for the enrichment personas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BaseModel {
    Phi3,
    Gemma2,
    #[default]
    Llama31,
    Qwen2,
    Deepseek,
}

impl BaseModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BaseModel::Phi3 => "phi3:14b",
            BaseModel::Gemma2 => "gemma2:27b",
            BaseModel::Llama31 => "llama3.1:70b",
            BaseModel::Qwen2 => "qwen2:72b",
            BaseModel::Deepseek => "deepseek-llm:67b",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "phi3:14b" => Some(BaseModel::Phi3),
            "gemma2:27b" => Some(BaseModel::Gemma2),
            "llama3.1:70b" => Some(BaseModel::Llama31),
            "qwen2:72b" => Some(BaseModel::Qwen2),
            "deepseek-llm:67b" => Some(BaseModel::Deepseek),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Persona: name + system instruction + decoding parameters
// ---------------------------------------------------------------------------

/// The six enrichment personas. The registered model name is the lowercase
/// persona name, so a re-run re-registers under the same names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Persona {
    /// Neutral MIT Technology Review editor stance; used for closed-choice classification.
    General,
    /// Produces the structured SUMMARY/IMPACT/AUTHOR/OPINION blob from an article.
    Summarizer,
    /// Generic text-editing persona; extracts one labeled section verbatim.
    Cleaner,
    Optimist,
    Pessimist,
    /// Social Progress Index assessor; drives the social-impact field group.
    SocialBenefits,
}

impl Persona {
    pub const ALL: [Persona; 6] = [
        Persona::General,
        Persona::Summarizer,
        Persona::Cleaner,
        Persona::Optimist,
        Persona::Pessimist,
        Persona::SocialBenefits,
    ];

    /// Registered model name on the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::General => "general",
            Persona::Summarizer => "summarizer",
            Persona::Cleaner => "cleaner",
            Persona::Optimist => "optimist",
            Persona::Pessimist => "pessimist",
            Persona::SocialBenefits => "social_benefits",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "general" => Some(Persona::General),
            "summarizer" => Some(Persona::Summarizer),
            "cleaner" => Some(Persona::Cleaner),
            "optimist" => Some(Persona::Optimist),
            "pessimist" => Some(Persona::Pessimist),
            "social_benefits" => Some(Persona::SocialBenefits),
            _ => None,
        }
    }

    /// Ollama modelfile for this persona: base model, system instruction, and
    /// the fixed decoding parameters.
    pub fn modelfile(&self, base_model: &str, num_ctx: u32) -> String {
        format!(
            "FROM {base}\nSYSTEM \"\"\"{system}\"\"\"\nPARAMETER temperature {temp}\nPARAMETER num_ctx {ctx}\nPARAMETER seed {seed}\n",
            base = base_model,
            system = self.system_prompt(),
            temp = PERSONA_TEMPERATURE,
            ctx = num_ctx,
            seed = PERSONA_SEED,
        )
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            Persona::General => GENERAL_SYSTEM,
            Persona::Summarizer => SUMMARIZER_SYSTEM,
            Persona::Cleaner => CLEANER_SYSTEM,
            Persona::Optimist => OPTIMIST_SYSTEM,
            Persona::Pessimist => PESSIMIST_SYSTEM,
            Persona::SocialBenefits => SOCIAL_BENEFITS_SYSTEM,
        }
    }
}

// ---------------------------------------------------------------------------
// System instructions
// ---------------------------------------------------------------------------

const GENERAL_SYSTEM: &str = "You are an expert in technology, economics, and social well-being, and are an editor for the MIT Technology Review. You are critical and discerning, with an eye for scientific accuracy. Make no reference to the prompt when providing your responses. Provide your responses directly without commentary.";

const SUMMARIZER_SYSTEM: &str = r#"You are an expert in technology, economics, and social well-being, and are an editor for the MIT Technology Review. You are critical and discerning, with an eye for scientific accuracy. Make no reference to the prompt when providing your responses. Provide your responses directly without commentary.

Every prompt will be an article about a technology written by the MIT Technology Review and why that technology will be a breakthrough. Provide a short summary of the article that describes the technology and why the MIT Technology Review picked it as a breakthrough technology in the year they did. Use this format:

"SUMMARY: [technology name] is a technology that does X, Y, and Z. The following industries are relevant to the technology: A, B, and C.
IMPACT: [technology name] could improve human well-being by A, B, or C. It could impact the economy by A, B, or C. The expected timeline for this technology to have a large economic or social impact is 0-5 years / 5-15 years / 15-30 / 30+ years.
AUTHOR: [author name]
OPINION: [technology name] has had/not had the expected impact on social well-being or the economy since the year [year]. The impact has/has not been restricted to research and not widely available. For example, A, B, or C."

More info about the above sections:
SUMMARY should be 30 words and describe the technology, its potential uses, and relevant industries. All this should be derived directly from the article.
IMPACT should be 50 words, and about the expected impact of the technology and a specific timeline of expected impact, and any other relevant factors for why this technology is expected to be a breakthrough. This should all be derived from the article.
OPINION should be 50 words, and should be your opinion about whether the technology has had anything like the expected impact on social well-being or the economy since the year [year], provide a specific example or two to justify your claim. Be critical, differentiate between simply impact at a research level and impact on a wide-reaching social or economic level.

Do not provide any commentary or give any introduction to the summary, do not start with anything like "Here is a short summary of the article", just give the summary of the article in the above format. Be terse and direct with your sentences in order to fit more information into the summary. Ensure the end result is less than 150 words."#;

const CLEANER_SYSTEM: &str = "Every prompt will be a request to take an action on some other text. Your job is to clean up the text exactly as requested. Make no reference to the prompt when providing your responses. Provide your responses directly without commentary.";

const OPTIMIST_SYSTEM: &str = r#"You are expert in technology, economics, and social well-being. You are a techno-optimist. You believe that technology has immense opportunity to improve human well-being and the economy, and you believe technological advancements are often under-estimated in the impact they have on the world.

Every prompt will be a request to provide your opinion on a given technology and discussion surrounding that technology. Ensure your reasoning is unbiased and objective. Do not use opinions. Give your best, well-researched and well-evidenced opinion regarding that discussion in response to the prompt. Keep your response to under 100 words. Do not provide any commentary or give any introduction to the response, just give the response. Be terse and direct with your sentences in order to fit more information into the response."#;

const PESSIMIST_SYSTEM: &str = r#"You are expert in technology, economics, and social well-being. You are a techno-pessimist. You believe that the impact of technology is always over-stated and over-hyped. You believe that the impacts of these technologies are almost always less significant than is claimed by media.

Every prompt will be a request to provide your opinion on a given technology and discussion surrounding that technology. Ensure your reasoning is unbiased and objective. Do not use opinions. Give your best, well-researched and well-evidenced opinion regarding that discussion in response to the prompt. Keep your response to under 100 words. Do not provide any commentary or give any introduction to the response, just give the response. Be terse and direct with your sentences in order to fit more information into the response."#;

const SOCIAL_BENEFITS_SYSTEM: &str = r#"You are an expert on the Social Progress Index, and on the many different ways we can measure the social and human benefits. You are also an expert on software, hardware, nanotech, biotech, and climate tech.

However, you do not assume that all technologies have had a significant impact on well-being. You are critical and discerning, with an eye for scientific accuracy. You believe that the impacts of these technologies are often less significant than is claimed by media.

Every prompt will be a request to assess a technology for its impact on social well-being. Consider all the variety of impacts the technology has had, including the creation of subsequent technologies enabled by that technology, and any other considerations.

Make an assessment using your best reasoning and provide evidence and justification that is unbiased and objective. Do not use opinions. Your assessment should be based on what the technology has been able to achieve.

Keep your response to under 100 words. Do not provide any commentary or give any introduction to the response, just give the response. Be terse and direct with your sentences in order to fit more information into the response."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persona_name_roundtrip() {
        for persona in Persona::ALL {
            assert_eq!(Persona::from_str(persona.as_str()), Some(persona));
        }
        assert_eq!(Persona::from_str("unknown"), None);
    }

    #[test]
    fn test_base_model_roundtrip() {
        for model in [
            BaseModel::Phi3,
            BaseModel::Gemma2,
            BaseModel::Llama31,
            BaseModel::Qwen2,
            BaseModel::Deepseek,
        ] {
            assert_eq!(BaseModel::from_str(model.as_str()), Some(model));
        }
        assert_eq!(BaseModel::from_str("mistral:7b"), None);
        assert_eq!(BaseModel::default(), BaseModel::Llama31);
    }

    #[test]
    fn test_modelfile_carries_decoding_parameters() {
        let mf = Persona::General.modelfile(BaseModel::Llama31.as_str(), 8192);
        assert!(mf.starts_with("FROM llama3.1:70b"));
        assert!(mf.contains("PARAMETER temperature 0.3"));
        assert!(mf.contains("PARAMETER num_ctx 8192"));
        assert!(mf.contains("PARAMETER seed 42"));
    }

    #[test]
    fn test_summarizer_template_names_all_sections() {
        let prompt = Persona::Summarizer.system_prompt();
        for label in ["SUMMARY:", "IMPACT:", "AUTHOR:", "OPINION:"] {
            assert!(prompt.contains(label), "missing {label}");
        }
    }
}
