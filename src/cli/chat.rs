//! CLI handlers for chatting, sessions and models.

use std::io::Write;

use crate::chat::{ChatApi, ChatStore};
use crate::error::Result;
use crate::stream::StreamCallbacks;
use crate::types::{RecordId, StreamRequest};

use super::{ChatArgs, Context, SessionCommands};

fn chat_api(context: &Context) -> ChatApi {
    ChatApi::new(context.client().clone())
}

/// Handle `aichat chat <message>`.
pub async fn handle_chat(context: &Context, args: ChatArgs) -> Result<()> {
    let session_id = args.session.map(RecordId::from);

    if args.no_stream {
        let store = ChatStore::new(chat_api(context));
        if args.model.is_none() {
            store.fetch_available_models().await?;
        }
        let response = store
            .send_message(args.message, session_id, args.model)
            .await?;
        if let Some(reply) = response.ai_message {
            println!("{}", reply.content);
        }
        if let Some(id) = response.session_id {
            eprintln!("session: {id}");
        }
        return Ok(());
    }

    let mut request = StreamRequest::new(args.message).with_deep_thinking(args.think);
    request.session_id = session_id;
    request.model = args.model;

    let callbacks = StreamCallbacks::new()
        .on_thinking(|text| {
            let mut stderr = std::io::stderr().lock();
            let _ = write!(stderr, "{text}");
        })
        .on_message(|text| {
            let mut stdout = std::io::stdout().lock();
            let _ = write!(stdout, "{text}");
            let _ = stdout.flush();
        });
    chat_api(context).stream_with(&request, callbacks).await?;
    println!();
    Ok(())
}

/// Handle `aichat sessions ...`.
pub async fn handle_sessions(context: &Context, command: SessionCommands) -> Result<()> {
    let api = chat_api(context);
    match command {
        SessionCommands::List => {
            let sessions = api.list_sessions().await?;
            if sessions.is_empty() {
                println!("No sessions");
            }
            for session in sessions {
                let title = if session.title.is_empty() {
                    "(untitled)"
                } else {
                    session.title.as_str()
                };
                println!("{:>8}  {title}", session.id.to_string());
            }
        }
        SessionCommands::Create { title } => {
            let session = api.create_session(title).await?;
            println!("Created session {}", session.id);
        }
        SessionCommands::History { id } => {
            let history = api.session_history(&RecordId::from(id)).await?;
            println!("# {}", history.title);
            for message in history.messages {
                let speaker = if message.is_user { "you" } else { "ai" };
                println!("[{speaker}] {}", message.content);
            }
        }
        SessionCommands::Rename { id, title } => {
            api.rename_session(&RecordId::from(id), title).await?;
            println!("Renamed");
        }
        SessionCommands::Delete { id } => {
            api.delete_session(&RecordId::from(id)).await?;
            println!("Deleted");
        }
    }
    Ok(())
}

/// Handle `aichat models`.
pub async fn handle_models(context: &Context) -> Result<()> {
    let catalog = chat_api(context).available_models().await?;
    let default = catalog.default_model.as_deref().unwrap_or_default();
    for model in &catalog.models {
        let marker = if model.value() == default { "*" } else { " " };
        let thinking = if model.supports_thinking() {
            "  [thinking]"
        } else {
            ""
        };
        println!("{marker} {:<24} {}{thinking}", model.value(), model.label());
    }
    Ok(())
}
