use vibe_core::models::VoteType;

use crate::commands::common::open_signed_in_client;
use crate::config_file::ResolvedConfig;
use crate::error::CliError;

pub async fn run_vote(
    question_id: &str,
    vote: VoteType,
    config: &ResolvedConfig,
) -> Result<(), CliError> {
    let client = open_signed_in_client(config).await?;
    let action = client.vote_question(question_id, vote).await?;
    println!("{action}");
    Ok(())
}
