use vibe_core::models::{AnswerInput, CheckinInput};

use crate::commands::common::open_signed_in_client;
use crate::config_file::ResolvedConfig;
use crate::error::CliError;

pub async fn run_checkin(
    answers: &[String],
    score: Option<f64>,
    notes: Option<String>,
    date: Option<String>,
    config: &ResolvedConfig,
) -> Result<(), CliError> {
    let input = CheckinInput {
        checkin_date: date,
        overall_score: score,
        notes,
        answers: answers
            .iter()
            .map(|raw| parse_answer(raw))
            .collect::<Result<_, _>>()?,
    };

    let client = open_signed_in_client(config).await?;
    let saved = client.save_checkin(input).await?;
    if saved.is_pending() {
        println!(
            "Check-in for {} queued (offline); it will sync on reconnect.",
            saved.checkin.checkin_date
        );
    } else {
        println!("{}", saved.checkin.id);
    }
    Ok(())
}

/// `QUESTION_ID=VALUE` with VALUE in 1..=5.
pub fn parse_answer(raw: &str) -> Result<AnswerInput, CliError> {
    let invalid = || CliError::InvalidAnswer(raw.to_string());
    let (question_id, value) = raw.split_once('=').ok_or_else(invalid)?;
    let question_id = question_id.trim();
    if question_id.is_empty() {
        return Err(invalid());
    }
    let value: u8 = value.trim().parse().map_err(|_| invalid())?;
    if !(1..=5).contains(&value) {
        return Err(invalid());
    }
    Ok(AnswerInput::new(question_id, value))
}
