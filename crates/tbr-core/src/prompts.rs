//! Prompt builders for every field group.
//!
//! The stored values are interpolated into fixed templates; closed-choice
//! prompts constrain the answer by instruction only, never by schema. The
//! allowed-choice slices below back the warn-only validation layer in the
//! enrichment loop.

use crate::technology::Technology;

/// Section labels of the summarizer's structured blob, in output order.
pub const SECTION_LABELS: [&str; 4] = ["SUMMARY", "IMPACT", "AUTHOR", "OPINION"];

/// Closed choices for the impact-level classification.
pub const IMPACT_LEVEL_CHOICES: [&str; 3] = ["Low Impact", "Medium Impact", "High Impact"];

/// Closed choices for the social impact level classifications.
pub const LEVEL_CHOICES: [&str; 3] = ["High", "Medium", "Low"];

/// Closed choices for the technology type classification.
pub const TYPE_CHOICES: [&str; 6] = [
    "software",
    "hardware",
    "nanotech",
    "biotech",
    "climate/energy",
    "other",
];

/// Closed choices for the quantity/quality-of-life classification.
pub const QUANT_QUAL_CHOICES: [&str; 4] =
    ["quantity of life", "quality of life", "both", "neither"];

/// Closed outcome categories for the breakthrough-outcome classification.
/// The stored value is the whole `"[result]: [justification]"` string.
pub const FLOP_TYPE_CHOICES: [&str; 6] = [
    "Transformative Breakthrough",
    "Delayed Breakthrough",
    "Niche Success",
    "Research Curiosity",
    "Overhyped Flop",
    "Net Harmful",
];

pub fn summarize_prompt(name: &str, year: i64, blurb: &str) -> String {
    format!(r#"Here is the article to summarize about {name} from the year {year}: "{blurb}""#)
}

/// Extraction prompt for one labeled section of the summarizer blob. The
/// cleaner receives the full raw blob every time and is told to ignore the
/// other three labels.
pub fn section_extract_prompt(section: &str, raw: &str) -> String {
    let others: Vec<String> = SECTION_LABELS
        .iter()
        .filter(|l| **l != section)
        .map(|l| format!("\"{l}:\""))
        .collect();
    format!(
        "Do not add any text of your own, and ignore the {}, {} and {} sections. Just return the \"{section}:\" text verbatim from the following text: \"{raw}\"",
        others[0], others[1], others[2]
    )
}

pub fn impact_level_prompt(name: &str, year: i64, blurb: &str) -> String {
    format!(
        r#"Given the following description of the technology "{name}" and its impact since the year {year}, pick one of the following words to describe its success "Low Impact", "Medium Impact", "High Impact". Only return one of those, do not provide any other commentary. Here is the description to use for your decision: "{blurb}""#
    )
}

/// Opinion-eliciting prompt shared by the optimist and pessimist personas;
/// the stance lives in the persona's system instruction, not here.
pub fn opinion_prompt(name: &str, year: i64, blurb: &str) -> String {
    format!(
        r#"Given the following description of the technology "{name}" and its impact since the year {year}, provide your opinion on the technology and its impact. Do not provide any other commentary. Here is the description to use for your opinion: "{blurb}""#
    )
}

pub fn type_prompt(name: &str, blurb: &str) -> String {
    format!(
        r#"Pick one of "software", "hardware", "nanotech", "biotech", "climate/energy", or "other" to describe the type of technology "{name}" is.
"Hardware" includes headphones, keyboards, pens, computer chips, etc.
"Software" includes encryption, user interfaces, etc.
"Nanotech" includes quantum wires, nanopiezoelectronics, etc.
"Biotech" includes gene therapy, drugs, etc.
"Climate/Energy" includes carbon capture, solar panels, fusion reactors etc.
Do not provide any other commentary, just return one of those words. Here is the description to help you decide on a type for this technology: "{blurb}""#
    )
}

pub fn social_actual_prompt(name: &str, year: i64, blurb: &str) -> String {
    format!(
        r#"Given the following description of the technology "{name}" and its impact since the year {year}, provide your opinion on the technology and its impact on social well-being and people's lives. Do not provide any other commentary. While you can consider all types of impacts, including potential off-shoot technologies, use only the actual impacts of the technology to make an assessment, do not hypothesize about potential impacts. While you should not use this description to color your assessment, I provide it as further context for you on the technology. This is the description of why the MIT Technology Review thought this technology would be a breakthrough: "{blurb}""#
    )
}

pub fn social_potential_prompt(name: &str, blurb: &str) -> String {
    format!(
        r#"Given the following description of the technology "{name}", provide your opinion on the technology and its potential impact on social well-being and people's lives. Do not provide any other commentary. While you can consider all types of impacts, including potential off-shoot technologies, ignore existing impacts and only hypothesize about potential impacts into the future from today onward. While you should not use this description to color your assessment, I provide it as further context for you on the technology. This is the description of why the MIT Technology Review thought this technology would be a breakthrough: "{blurb}""#
    )
}

/// Level prompt for either the actual or the potential social impact.
/// `kind` is "actual" or "potential"; `assessment` is the narrative the
/// decision is based on.
pub fn social_level_prompt(kind: &str, name: &str, assessment: &str) -> String {
    format!(
        r#"Choose one of "High", "Medium", or "Low" to describe the {kind} social impact level of the technology {name}. Do not provide any additional commentary, simply return one of those three words. Use this assessment of the {kind} impact to inform your decision: "{assessment}""#
    )
}

pub fn spi_prompt(name: &str, year: i64, actual: &str, potential: &str) -> String {
    format!(
        r#"Given the following commentary on the technology "{name}", provide your best guess at a % impact of this technology on the Social Progress Index since the year {year} and over the next 20 years.
Consider a range of possible % impacts over a single order of magnitude and provide a single number that you think is the most likely.
Do not provide any other commentary. Just return a single % number. Remember that 1% means a 1% increase in the Social Progress Index can be attributed SOLELY to {name}. So we expect the number to be small yet precise.
The number may be negative if the technology has been a net harm to social progress.
Here is the commentary to use for your decision:
"{actual}"
"{potential}""#
    )
}

pub fn quant_qual_prompt(name: &str, year: i64, blurb: &str) -> String {
    format!(
        r#"Pick one of "quantity of life", "quality of life", "both", or "neither" to describe which dimension of social progress the technology "{name}" (a breakthrough pick from the year {year}) primarily advances. Do not provide any other commentary, just return one of those four answers.
Use this reference essay on the distinction to ground your decision:
"{essay}"
Here is the description of the technology: "{blurb}""#,
        essay = REFERENCE_ESSAY
    )
}

/// Outcome-classification prompt: concatenates nearly every previously
/// derived field so the classifier sees the whole picture, including fields
/// written earlier in the same pass.
pub fn flop_type_prompt(tech: &Technology) -> String {
    let pick = |v: &Option<String>| v.clone().unwrap_or_default();
    format!(
        r#"Classify the overall outcome of the technology "{name}", picked as a breakthrough in the year {year}. Pick exactly one of these six categories: "Transformative Breakthrough", "Delayed Breakthrough", "Niche Success", "Research Curiosity", "Overhyped Flop", or "Net Harmful".
Answer in the shape "[result]: [justification]" where [result] is one of the six categories and [justification] is one or two short sentences. Do not provide any other commentary.
Use this reference essay on measuring social progress to ground your decision:
"{essay}"
Here is everything known about the technology:
Description: "{blurb}"
Actual social impact: "{social_impact}" (level: {social_impact_level})
Potential social impact: "{social_impact_potential}" (level: {social_impact_potential_level})
Estimated Social Progress Index contribution: "{spi_impact}"
Optimist view: "{optimist}"
Pessimist view: "{pessimist}"
Expected impact: "{impact}"
Editorial opinion: "{opinion}""#,
        name = tech.name,
        year = tech.year,
        essay = REFERENCE_ESSAY,
        blurb = tech.blurb,
        social_impact = pick(&tech.social_impact),
        social_impact_level = pick(&tech.social_impact_level),
        social_impact_potential = pick(&tech.social_impact_potential),
        social_impact_potential_level = pick(&tech.social_impact_potential_level),
        spi_impact = pick(&tech.spi_impact),
        optimist = pick(&tech.optimist),
        pessimist = pick(&tech.pessimist),
        impact = pick(&tech.impact),
        opinion = pick(&tech.opinion),
    )
}

/// Fixed grounding essay for the quantity/quality and outcome classifications.
pub const REFERENCE_ESSAY: &str = r#"Social progress is not one number. The Social Progress Index separates what a society provides into basic human needs, foundations of well-being, and opportunity, and a technology can move any of these without moving the others. It is useful to split a technology's contribution along two axes: quantity of life and quality of life.

Quantity of life is the bluntest measure: does the technology keep people alive who would otherwise die, or add years to lives already being lived? Vaccines, antibiotics, water treatment, and famine-resistant crops are canonical quantity technologies. Their effect shows up in mortality tables and life expectancy curves, and it tends to compound: a child saved by an oral rehydration kit goes on to be saved again by every later medical advance.

Quality of life is broader and harder to measure: does the technology make the years people already have healthier, freer, richer in capability, or more dignified? Literacy tools, communication networks, prosthetics, and cheap lighting are quality technologies. Their effect shows up in education, access to information, personal autonomy, and time reclaimed from drudgery.

Many celebrated technologies advance neither. A breakthrough can remain a research curiosity for decades, reach only a narrow industrial niche, or deliver its gains to people whose needs were already met, in which case its social-progress contribution rounds to zero however impressive the science. A few are net harmful: they degrade attention, concentrate power, or create risks that outweigh their conveniences.

When classifying a technology, ask where its effect would appear if it appeared at all: in the mortality statistics (quantity), in the lived-experience indicators (quality), in both, or in neither. Be skeptical of claimed impacts that have not yet left a trace in either."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_extract_ignores_other_labels() {
        let p = section_extract_prompt("AUTHOR", "raw blob");
        assert!(p.contains(r#"return the "AUTHOR:" text verbatim"#));
        assert!(p.contains(r#""SUMMARY:""#));
        assert!(p.contains(r#""IMPACT:""#));
        assert!(p.contains(r#""OPINION:""#));
        assert!(p.contains("raw blob"));
    }

    #[test]
    fn test_flop_prompt_names_all_six_categories() {
        let tech = Technology {
            name: "Foo".into(),
            year: 2020,
            blurb: "text".into(),
            ..Default::default()
        };
        let p = flop_type_prompt(&tech);
        for category in FLOP_TYPE_CHOICES {
            assert!(p.contains(category), "missing {category}");
        }
        assert!(p.contains("[result]: [justification]"));
    }

    #[test]
    fn test_level_prompt_kinds() {
        let actual = social_level_prompt("actual", "Foo", "assessment");
        let potential = social_level_prompt("potential", "Foo", "assessment");
        assert!(actual.contains("actual social impact level"));
        assert!(potential.contains("potential social impact level"));
    }
}
