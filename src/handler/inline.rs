use teloxide::types::{ChosenInlineResult, InlineQuery};

use crate::{error::HandlerResult, state::AppState};

pub async fn handle_inline_query(query: InlineQuery, state: AppState) -> HandlerResult<()> {
    debug!("Inline query {} from {}: {:?}", query.id, query.from.id, query.query);
    state.delivery.create_placeholder(&query.id, &query.query).await?;
    Ok(())
}

/// Starts the deferred delivery and returns without waiting for it.
pub async fn handle_chosen_inline_result(chosen: ChosenInlineResult, state: AppState) -> HandlerResult<()> {
    debug!("Inline result {} chosen by {}", chosen.result_id, chosen.from.id);
    if state
        .delivery
        .on_selected(&chosen.result_id, chosen.inline_message_id.as_deref())
        .is_some()
    {
        info!("Delivery started for {}", chosen.result_id);
    }
    Ok(())
}
