use crate::tally::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "pollName")]
    pub poll_name: String,
    #[serde(rename = "pollId")]
    pub poll_id: Option<u64>,
    /// Relative to the directory of the configuration file.
    #[serde(rename = "outputPath")]
    pub output_path: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub threshold: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct VoteSource {
    /// json, csv or xlsx
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "firstVoteRowIndex")]
    _first_vote_row_index: Option<JSValue>,
    #[serde(rename = "worksheetName")]
    pub worksheet_name: Option<String>,
    #[serde(rename = "onlySubmitted")]
    pub only_submitted: Option<bool>,
}

impl VoteSource {
    pub fn new(provider: &str, file_path: &str) -> VoteSource {
        VoteSource {
            provider: provider.to_string(),
            file_path: file_path.to_string(),
            _first_vote_row_index: None,
            worksheet_name: None,
            only_submitted: None,
        }
    }

    /// The first row holding votes. It starts at 1 to respect most conventions in the excel world.
    /// Defaults to 2: the first row is a header.
    pub fn first_vote_row_index(&self) -> TallyResult<usize> {
        if self._first_vote_row_index.is_none() {
            return Ok(2);
        }
        let x = read_js_int(&self._first_vote_row_index)?;
        ensure!(
            x >= 1,
            ParsingJsonNumberSnafu {
                content: x.to_string()
            }
        );
        Ok(x)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ConfigOption {
    pub id: u64,
    pub name: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollRules {
    /// Drafts are counted unless this is set.
    #[serde(rename = "onlySubmitted")]
    pub only_submitted: Option<bool>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: Option<OutputSettings>,
    #[serde(default)]
    pub options: Vec<ConfigOption>,
    #[serde(rename = "voteSources", default)]
    pub vote_sources: Vec<VoteSource>,
    #[serde(default)]
    pub rules: PollRules,
}

impl PollConfig {
    pub fn poll_options(&self) -> Vec<PollOption> {
        self.options
            .iter()
            .map(|o| PollOption::new(o.id, &o.name))
            .collect()
    }

    pub fn force_only_submitted(&mut self) {
        self.rules.only_submitted = Some(true);
        for source in self.vote_sources.iter_mut() {
            source.only_submitted = Some(true);
        }
    }
}

pub fn read_config(path: &str) -> TallyResult<PollConfig> {
    let config_str = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    serde_json::from_str(&config_str).context(ParsingJsonSnafu {})
}

pub fn read_summary(path: &str) -> TallyResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

fn read_js_int(x: &Option<JSValue>) -> TallyResult<usize> {
    let content = format!("{:?}", x);
    match x {
        Some(JSValue::Number(n)) => n
            .as_u64()
            .map(|x| x as usize)
            .context(ParsingJsonNumberSnafu { content }),
        Some(JSValue::String(s)) => s
            .trim()
            .parse::<usize>()
            .ok()
            .context(ParsingJsonNumberSnafu { content }),
        _ => None.context(ParsingJsonNumberSnafu { content }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_config() {
        let config: PollConfig = serde_json::from_str(
            r#"{
                "outputSettings": {"pollName": "Lunch", "pollId": 12},
                "options": [{"id": 1, "name": "Pizza"}, {"id": 2, "name": "Tacos"}],
                "voteSources": [{"provider": "csv", "filePath": "votes.csv", "firstVoteRowIndex": "3"}],
                "rules": {"onlySubmitted": true}
            }"#,
        )
        .unwrap();
        assert_eq!(config.output_settings.as_ref().unwrap().poll_id, Some(12));
        assert_eq!(config.poll_options()[1], PollOption::new(2, "Tacos"));
        assert_eq!(config.vote_sources[0].first_vote_row_index().unwrap(), 3);
        assert_eq!(config.rules.only_submitted, Some(true));
    }

    #[test]
    fn minimal_config() {
        let config: PollConfig = serde_json::from_str(
            r#"{"voteSources": [{"provider": "json", "filePath": "votes.json"}]}"#,
        )
        .unwrap();
        assert!(config.output_settings.is_none());
        assert!(config.options.is_empty());
        assert_eq!(config.vote_sources[0].first_vote_row_index().unwrap(), 2);
        assert_eq!(config.rules, PollRules::default());
    }

    #[test]
    fn row_index_must_be_positive() {
        let source: VoteSource = serde_json::from_str(
            r#"{"provider": "csv", "filePath": "v.csv", "firstVoteRowIndex": 0}"#,
        )
        .unwrap();
        assert!(source.first_vote_row_index().is_err());
    }
}
