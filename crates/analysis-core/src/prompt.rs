//! Prompt assembly and fingerprinting.

use sha2::{Digest, Sha256};

use crate::types::AnalysisInput;

/// Instruction appended to every prompt describing the reply format.
pub const SYSTEM_PROMPT: &str = "Respond only with a JSON object containing the fields \
\"summary\" (string), \"keyFindings\" (array of strings), \"recommendations\" (array of strings) \
and \"riskFactors\" (array of strings). Do not add any text outside the JSON object.";

/// Build the single prompt sent to the model.
///
/// Sections without data are left out.
pub fn build_prompt(input: &AnalysisInput) -> String {
    let mut prompt = String::from(
        "You are a clinical assistant helping a health professional build an integrative care plan. \
         Analyze the patient data below.\n",
    );

    if let Some(patient) = &input.patient_info {
        let fields = [
            ("Patient", &patient.full_name),
            ("Birth date", &patient.birth_date),
            ("Gender", &patient.gender),
            ("Occupation", &patient.occupation),
            ("Main complaint", &patient.main_complaint),
        ];
        let lines: Vec<String> = fields
            .iter()
            .filter_map(|(label, value)| {
                value
                    .as_deref()
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(|v| format!("{label}: {v}"))
            })
            .collect();
        if !lines.is_empty() {
            prompt.push('\n');
            prompt.push_str(&lines.join("\n"));
            prompt.push('\n');
        }
    }

    push_section(&mut prompt, "Previous findings", input.findings.as_deref());
    push_section(
        &mut prompt,
        "Previous recommendations",
        input.recommendations.as_deref(),
    );

    let files: Vec<&str> = input
        .file_names
        .iter()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .collect();
    if !files.is_empty() {
        prompt.push_str("\nAttached files:\n");
        for file in files {
            prompt.push_str("- ");
            prompt.push_str(file);
            prompt.push('\n');
        }
    }

    prompt.push('\n');
    prompt.push_str(SYSTEM_PROMPT);
    prompt
}

fn push_section(prompt: &mut String, title: &str, body: Option<&str>) {
    if let Some(body) = body.map(str::trim).filter(|b| !b.is_empty()) {
        prompt.push('\n');
        prompt.push_str(title);
        prompt.push_str(":\n");
        prompt.push_str(body);
        prompt.push('\n');
    }
}

/// Compute a stable SHA-256 fingerprint for a prompt string.
pub fn hash_prompt(prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex
}

/// Fingerprint of an input, used to decide whether a stored result is stale.
pub fn hash_input(input: &AnalysisInput) -> String {
    hash_prompt(&build_prompt(input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PatientInfo;

    #[test]
    fn test_hash_prompt_stable() {
        let first = hash_prompt("test prompt");
        let second = hash_prompt("test prompt");
        let different = hash_prompt("another prompt");

        assert_eq!(first, second);
        assert_ne!(first, different);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn test_prompt_includes_available_sections() {
        let input = AnalysisInput {
            findings: Some("TSH elevated".to_string()),
            recommendations: None,
            file_names: vec!["tsh.pdf".to_string(), " ".to_string()],
            patient_info: Some(PatientInfo::named("Ana")),
        };
        let prompt = build_prompt(&input);

        assert!(prompt.contains("Patient: Ana"));
        assert!(prompt.contains("Previous findings:\nTSH elevated"));
        assert!(!prompt.contains("Previous recommendations"));
        assert!(prompt.contains("- tsh.pdf\n"));
        assert!(prompt.contains("\"keyFindings\""));
    }

    #[test]
    fn test_hash_input_tracks_changes() {
        let mut input = AnalysisInput {
            findings: Some("TSH elevated".to_string()),
            ..Default::default()
        };
        let before = hash_input(&input);
        input.findings = Some("TSH normal".to_string());
        assert_ne!(before, hash_input(&input));
    }
}
