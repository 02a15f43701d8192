use serenity::all::{
    CommandInteraction, Context, CreateInteractionResponse, CreateInteractionResponseMessage,
    Message, ReactionType,
};

pub const SUCCESS_REACTION: &str = "✅";
pub const FAILURE_REACTION: &str = "🙅‍♀️";

pub async fn interaction_reply(
    command: &CommandInteraction,
    ctx: &Context,
    content: impl Into<String>,
) -> Result<(), anyhow::Error> {
    command
        .create_response(
            ctx,
            CreateInteractionResponse::Message(CreateInteractionResponseMessage::new().content(content)),
        )
        .await?;
    Ok(())
}

pub async fn interaction_reply_ephemeral(
    command: &CommandInteraction,
    ctx: &Context,
    content: impl Into<String>,
) -> Result<(), anyhow::Error> {
    command
        .create_response(
            ctx,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(true),
            ),
        )
        .await?;
    Ok(())
}

pub async fn react(ctx: &Context, msg: &Message, emoji: &str) -> Result<(), anyhow::Error> {
    msg.react(ctx, ReactionType::Unicode(emoji.to_string())).await?;
    Ok(())
}
