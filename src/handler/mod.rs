mod inline;
mod message;

use teloxide::{
    dispatching::{UpdateFilterExt, UpdateHandler},
    dptree,
    types::Update,
};

use message::MessageUrls;

pub fn get_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .filter_map(MessageUrls::from_message)
                .endpoint(message::handle_message_urls),
        )
        .branch(Update::filter_inline_query().endpoint(inline::handle_inline_query))
        .branch(Update::filter_chosen_inline_result().endpoint(inline::handle_chosen_inline_result))
}
