//! SOAP section parser: splits free-form model output into four clinical sections.
//!
//! Model output does not follow a guaranteed format, so the parser walks an ordered ladder
//! of strategies and stops at the first one that yields any non-empty section:
//!
//! 1. marker scan (`===SUBJECTIVE===`, `Subjective:`, `S:`, headings)
//! 2. keyword substring scan (`chief complaint`, `vital signs`, `impression`, ...)
//! 3. blank-line paragraph split, assigned S/O/A/P positionally
//! 4. the whole text as subjective
//!
//! The result always has four non-empty fields.

use crate::models::clinical::SoapNote;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Subjective,
    Objective,
    Assessment,
    Plan,
}

type Sections = [String; 4];

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Subjective,
        Section::Objective,
        Section::Assessment,
        Section::Plan,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Section::Subjective => "subjective",
            Section::Objective => "objective",
            Section::Assessment => "assessment",
            Section::Plan => "plan",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Section::Subjective => "Subjective",
            Section::Objective => "Objective",
            Section::Assessment => "Assessment",
            Section::Plan => "Plan",
        }
    }

    /// Line prefixes, lowercase, longest first within each family.
    fn markers(self) -> &'static [&'static str] {
        match self {
            Section::Subjective => &[
                "===subjective===",
                "=== subjective ===",
                "**subjective:**",
                "**subjective**",
                "### subjective",
                "## subjective",
                "# subjective",
                "subjective (s):",
                "subjective:",
                "s:",
            ],
            Section::Objective => &[
                "===objective===",
                "=== objective ===",
                "**objective:**",
                "**objective**",
                "### objective",
                "## objective",
                "# objective",
                "objective (o):",
                "objective:",
                "o:",
            ],
            Section::Assessment => &[
                "===assessment===",
                "=== assessment ===",
                "**assessment:**",
                "**assessment**",
                "### assessment",
                "## assessment",
                "# assessment",
                "assessment (a):",
                "assessment:",
                "a:",
            ],
            Section::Plan => &[
                "===plan===",
                "=== plan ===",
                "**plan:**",
                "**plan**",
                "### plan",
                "## plan",
                "# plan",
                "plan (p):",
                "plan:",
                "p:",
            ],
        }
    }

    fn keywords(self) -> &'static [&'static str] {
        match self {
            Section::Subjective => &["subjective", "chief complaint", "history of present illness"],
            Section::Objective => &[
                "objective",
                "physical examination",
                "physical exam",
                "vital signs",
                "exam",
            ],
            Section::Assessment => &["assessment", "impression", "diagnosis"],
            Section::Plan => &["plan", "treatment", "follow-up", "management"],
        }
    }

    /// Deterministic filler for a section nothing could be extracted for.
    pub fn placeholder(self) -> String {
        format!("{} information to be documented.", self.title())
    }
}

/// Parses `text` into a SOAP note. Never fails.
///
/// An empty subjective section falls back to `transcript` when one is supplied and non-empty.
pub fn parse_soap_sections(text: &str, transcript: Option<&str>) -> SoapNote {
    let strategies: [fn(&str) -> Sections; 3] = [scan_markers, scan_keywords, split_paragraphs];

    let sections = strategies
        .iter()
        .map(|strategy| strategy(text))
        .find(|sections| sections.iter().any(|s| !s.is_empty()))
        .unwrap_or_else(|| [text.trim().to_string(), String::new(), String::new(), String::new()]);

    finalize(sections, transcript)
}

fn finalize(sections: Sections, transcript: Option<&str>) -> SoapNote {
    let [subjective, objective, assessment, plan] = sections.map(|s| s.trim().to_string());

    let fill = |value: String, section: Section| {
        if value.is_empty() {
            section.placeholder()
        } else {
            value
        }
    };

    let subjective = if subjective.is_empty() {
        transcript
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Section::Subjective.placeholder())
    } else {
        subjective
    };

    SoapNote {
        subjective,
        objective: fill(objective, Section::Objective),
        assessment: fill(assessment, Section::Assessment),
        plan: fill(plan, Section::Plan),
    }
}

// ── Strategy 1: marker scan ─────────────────────────────────────────────────

/// Returns the section a line opens and the text following its marker.
fn match_marker(line: &str) -> Option<(Section, &str)> {
    let trimmed = line.trim();
    let lower = trimmed.to_ascii_lowercase();

    for section in Section::ALL {
        if let Some(marker) = section.markers().iter().find(|m| lower.starts_with(*m)) {
            let rest = trimmed[marker.len()..].trim_start_matches(|c: char| {
                c == ':' || c == '*' || c == '=' || c.is_whitespace()
            });
            return Some((section, rest));
        }
    }

    // bare heading such as "SUBJECTIVE" or "**Plan**:"
    let bare = lower.trim_matches(|c: char| "#*=:- ".contains(c));
    Section::ALL
        .into_iter()
        .find(|s| bare == s.name())
        .map(|s| (s, ""))
}

fn scan_markers(text: &str) -> Sections {
    let mut sections: Sections = Default::default();
    let mut current: Option<Section> = None;

    for line in text.lines() {
        if let Some((section, rest)) = match_marker(line) {
            current = Some(section);
            let acc = &mut sections[section.index()];
            acc.push_str(rest);
            acc.push('\n');
        } else if let Some(section) = current {
            let acc = &mut sections[section.index()];
            acc.push_str(line);
            acc.push('\n');
        }
    }

    sections.map(|s| s.trim().to_string())
}

// ── Strategy 2: keyword substring scan ──────────────────────────────────────

struct KeywordHit {
    start: usize,
    end: usize,
    section: Section,
}

/// Every keyword occurrence in `lower`, including matches inside longer words.
fn keyword_hits(lower: &str) -> Vec<KeywordHit> {
    let mut hits = Vec::new();
    for section in Section::ALL {
        for keyword in section.keywords() {
            for (start, _) in lower.match_indices(keyword) {
                hits.push(KeywordHit {
                    start,
                    end: start + keyword.len(),
                    section,
                });
            }
        }
    }
    hits
}

fn scan_keywords(text: &str) -> Sections {
    // ASCII lowercasing keeps byte offsets aligned with `text`.
    let lower = text.to_ascii_lowercase();
    let hits = keyword_hits(&lower);
    let mut sections: Sections = Default::default();

    for section in Section::ALL {
        let Some(first) = hits
            .iter()
            .filter(|h| h.section == section)
            .min_by_key(|h| (h.start, std::cmp::Reverse(h.end)))
        else {
            continue;
        };

        let stop = hits
            .iter()
            .filter(|h| h.section != section && h.start >= first.end)
            .map(|h| h.start)
            .min()
            .unwrap_or(text.len());

        sections[section.index()] = text[first.end..stop]
            .trim_start_matches(|c: char| c == ':' || c == '-' || c.is_whitespace())
            .trim()
            .to_string();
    }

    sections
}

// ── Strategy 3: paragraph split ─────────────────────────────────────────────

fn split_paragraphs(text: &str) -> Sections {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }

    let mut sections: Sections = Default::default();
    for (slot, paragraph) in sections.iter_mut().zip(paragraphs) {
        *slot = paragraph.trim().to_string();
    }
    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_non_empty(note: &SoapNote) -> bool {
        [&note.subjective, &note.objective, &note.assessment, &note.plan]
            .iter()
            .all(|s| !s.trim().is_empty())
    }

    #[test]
    fn test_explicit_markers_extract_verbatim() {
        let text = "===SUBJECTIVE===\nPatient reports a throbbing headache for 3 days.\nWorse in the morning.\n\n===OBJECTIVE===\nBP 128/84, afebrile.\n===ASSESSMENT===\nLikely tension headache.\n===PLAN===\nIbuprofen 400mg PRN.\nReturn in 2 weeks.";
        let note = parse_soap_sections(text, None);

        assert_eq!(
            note.subjective,
            "Patient reports a throbbing headache for 3 days.\nWorse in the morning."
        );
        assert_eq!(note.objective, "BP 128/84, afebrile.");
        assert_eq!(note.assessment, "Likely tension headache.");
        assert_eq!(note.plan, "Ibuprofen 400mg PRN.\nReturn in 2 weeks.");
    }

    #[test]
    fn test_colon_markers_seed_with_trailing_text() {
        let text = "S: Cough for a week.\nO: Lungs clear.\nA: Viral URI.\nP: Fluids and rest.";
        let note = parse_soap_sections(text, None);
        assert_eq!(note.subjective, "Cough for a week.");
        assert_eq!(note.objective, "Lungs clear.");
        assert_eq!(note.assessment, "Viral URI.");
        assert_eq!(note.plan, "Fluids and rest.");
    }

    #[test]
    fn test_markdown_headings_and_preamble() {
        let text = "Here is the SOAP note:\n\n**Subjective:** Sore throat.\n## Objective\nTonsillar exudate.\n**Assessment**\nStrep pharyngitis.\nPlan (P): Amoxicillin.";
        let note = parse_soap_sections(text, None);
        assert_eq!(note.subjective, "Sore throat.");
        assert_eq!(note.objective, "Tonsillar exudate.");
        assert_eq!(note.assessment, "Strep pharyngitis.");
        assert_eq!(note.plan, "Amoxicillin.");
    }

    #[test]
    fn test_marker_of_other_section_switches_mid_accumulation() {
        let text = "Subjective:\nline one\nline two\nPlan: follow up\nObjective: normal exam";
        let note = parse_soap_sections(text, None);
        assert_eq!(note.subjective, "line one\nline two");
        assert_eq!(note.plan, "follow up");
        assert_eq!(note.objective, "normal exam");
        assert_eq!(note.assessment, "Assessment information to be documented.");
    }

    #[test]
    fn test_keyword_scan_when_no_line_markers() {
        let text = "The chief complaint is knee pain after a fall. Vital signs are stable and the knee is swollen. Impression is a sprain. Treatment includes ice and rest.";
        let note = parse_soap_sections(text, None);
        assert_eq!(note.subjective, "is knee pain after a fall.");
        assert_eq!(note.objective, "are stable and the knee is swollen.");
        assert_eq!(note.assessment, "is a sprain.");
        assert_eq!(note.plan, "includes ice and rest.");
    }

    #[test]
    fn test_keywords_match_inside_words() {
        // "plan" inside "explanation" is a hit, so the paragraph split never runs
        let text = "Patient needs an explanation of results.\n\nSecond.\n\nThird.\n\nFourth.";
        let note = parse_soap_sections(text, None);
        assert_eq!(note.plan, "ation of results.\n\nSecond.\n\nThird.\n\nFourth.");
        assert_eq!(note.subjective, "Subjective information to be documented.");
        assert_eq!(note.objective, "Objective information to be documented.");

        let note = parse_soap_sections("Reviewed an example case.", None);
        assert_eq!(note.objective, "ple case.");
    }

    #[test]
    fn test_paragraph_split_assigns_positionally() {
        let text = "Feels tired.\n\nWeight 70kg.\n\nLikely anemia.\n\nCheck CBC.\n\nExtra trailing remark.";
        let note = parse_soap_sections(text, None);
        assert_eq!(note.subjective, "Feels tired.");
        assert_eq!(note.objective, "Weight 70kg.");
        assert_eq!(note.assessment, "Likely anemia.");
        assert_eq!(note.plan, "Check CBC.");
    }

    #[test]
    fn test_fewer_paragraphs_fill_placeholders() {
        let note = parse_soap_sections("Feels tired.\n\nWeight 70kg.", None);
        assert_eq!(note.subjective, "Feels tired.");
        assert_eq!(note.objective, "Weight 70kg.");
        assert_eq!(note.assessment, "Assessment information to be documented.");
        assert_eq!(note.plan, "Plan information to be documented.");
    }

    #[test]
    fn test_empty_subjective_uses_transcript() {
        let note = parse_soap_sections("Objective: Temp 38.2C", Some("  I have had a fever  "));
        assert_eq!(note.subjective, "I have had a fever");
        assert_eq!(note.objective, "Temp 38.2C");
    }

    #[test]
    fn test_blank_transcript_falls_back_to_placeholder() {
        let note = parse_soap_sections("", Some("   "));
        assert_eq!(note.subjective, "Subjective information to be documented.");
    }

    #[test]
    fn test_always_four_non_empty_fields() {
        let inputs = [
            "",
            "   \n\n  ",
            "S:",
            "===PLAN===",
            "just one line",
            "Überweisung zum Kardiologen. Diagnose unklar.",
            "a:\nb:\nc:",
            "plan plan plan",
            "\u{1F912} fever",
        ];
        for input in inputs {
            let note = parse_soap_sections(input, None);
            assert!(all_non_empty(&note), "empty field for input {input:?}: {note:?}");
        }
    }
}
