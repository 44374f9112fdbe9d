//! Prompt text for the four remote operations.
//!
//! The frame prompt carries the compositional contract every generated frame
//! must follow: a large centered empty photo rectangle, a thick bottom border
//! for the title, a thick top border with a center tab for the logo, thin
//! side borders, decoration only inside the borders, and never any
//! placeholder text.

use crate::types::{BrandProfile, LayoutIdea, PhotoSize, CONCEPT_COUNT};

/// Wrap text in a labeled section for structured prompts.
pub fn section(label: &str, content: &str) -> String {
    format!("## {}\n{}", label, content)
}

/// Create a bulleted list from items.
pub fn bullet_list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(|item| format!("- {}", item.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt for the brand researcher.
///
/// `restate_schema` spells out the JSON shape in the prompt for requests that
/// cannot carry a response schema (web search).
pub fn research(company_name: &str, restate_schema: bool) -> String {
    let mut prompt = format!(
        "Research the company \"{}\" and describe its brand identity.\n\
         Provide: industry, personality, targetAudience, \
         colors (the brand's main colors as hex codes or color names), \
         designStyle, typography and marketingTone.",
        company_name
    );
    if restate_schema {
        prompt.push_str(
            "\n\nRespond with only a JSON object of this exact shape:\n\
             {\"industry\": string, \"personality\": string, \"targetAudience\": string, \
             \"colors\": [string], \"designStyle\": string, \"typography\": string, \
             \"marketingTone\": string}",
        );
    }
    prompt
}

/// Prompt for the layout ideator.
pub fn ideation(profile: &BrandProfile) -> String {
    let brand = bullet_list(&[
        format!("Industry: {}", profile.industry),
        format!("Personality: {}", profile.personality),
        format!("Target audience: {}", profile.target_audience),
        format!("Colors: {}", profile.color_list()),
        format!("Design style: {}", profile.design_style),
        format!("Typography: {}", profile.typography),
        format!("Marketing tone: {}", profile.marketing_tone),
    ]);
    format!(
        "You design branded photo frames for corporate events.\n\n{}\n\n\
         Propose exactly {} distinct layout concepts for a frame that surrounds an event photo. \
         Each concept needs a short title and a one-paragraph description of its \
         border decoration, color use and mood. \
         Every concept keeps a large empty center area for the photo.",
        section("Brand", &brand),
        CONCEPT_COUNT
    )
}

/// Options that shape one frame prompt.
#[derive(Debug, Clone, Copy)]
pub struct FrameOptions<'a> {
    pub photo_size: PhotoSize,
    /// The caller overlays its own logo; leave the tab empty.
    pub has_logo: bool,
    /// The caller overlays this title; leave the title area empty.
    pub event_title: Option<&'a str>,
}

/// Prompt for frame synthesis of one layout concept.
pub fn frame(idea: &LayoutIdea, profile: &BrandProfile, options: FrameOptions<'_>) -> String {
    let size = options.photo_size;
    let rules = bullet_list(&[
        format!(
            "A large, perfectly empty rectangle in the center with the proportions of \
             {} pixels ({}:{}). It occupies about 80% of the frame area \
             and is filled with a flat neutral color.",
            size, size.width, size.height
        ),
        "A thick border along the bottom, reserved for the event title.".to_string(),
        "A thick border along the top with a tab in its center, reserved for a logo.".to_string(),
        "Thin borders on the left and right sides.".to_string(),
        "All decoration stays inside the borders; nothing overlaps the empty rectangle."
            .to_string(),
        "Never draw placeholder text, lorem ipsum, fake logos or watermarks anywhere.".to_string(),
    ]);

    let logo_rule = if options.has_logo {
        "Leave the logo tab completely blank; a logo will be placed there afterwards."
    } else {
        "The logo tab may carry a simple abstract brand motif, but no lettering."
    };
    let title_rule = match options.event_title {
        Some(title) => format!(
            "Leave the bottom title area blank; the title \"{}\" will be overlaid afterwards.",
            title
        ),
        None => "Keep the bottom title area clean and free of text.".to_string(),
    };

    format!(
        "Create a 16:9 branded photo frame for a {} company.\n\n{}\n\n{}\n\n{}\n\n{}",
        if profile.industry.trim().is_empty() {
            "modern"
        } else {
            profile.industry.trim()
        },
        section("Layout", &idea.description),
        section("Composition rules", &rules),
        section(
            "Brand",
            &bullet_list(&[
                format!("Use the brand colors: {}", profile.color_list()),
                format!("Design style: {}", profile.design_style),
            ])
        ),
        section("Overlays", &bullet_list(&[logo_rule.to_string(), title_rule])),
    )
}

/// Prompt for an edit; the instruction is passed through with a guard rail.
pub fn edit(instruction: &str) -> String {
    format!(
        "{}\n\nKeep the frame layout, the empty center rectangle and the border structure intact. \
         Do not add any text.",
        instruction.trim()
    )
}
