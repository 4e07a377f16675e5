//! The language server.
//!
//! Buffers are kept as ropes keyed by URI. The [`Engine`] lives behind a
//! `tokio::sync::Mutex` and every request runs on the blocking pool, so the
//! caches see one request at a time and HTTP never blocks the executor.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use ropey::Rope;
use tokio::sync::{Mutex, RwLock};
use tower_lsp::jsonrpc::{Error, Result};
use tower_lsp::lsp_types::{
    CompletionOptions, CompletionParams, CompletionResponse, Diagnostic, DidChangeTextDocumentParams,
    DidCloseTextDocumentParams, DidOpenTextDocumentParams, DidSaveTextDocumentParams,
    GotoDefinitionParams, GotoDefinitionResponse, InitializeParams, InitializeResult,
    InitializedParams, MessageType, OneOf, Position, ServerCapabilities, ServerInfo,
    TextDocumentSyncCapability, TextDocumentSyncKind, Url,
};
use tower_lsp::{async_trait, Client, LanguageServer};
use tracing::{debug, error, info};

use crate::config::Settings;
use crate::diagnostics::ParseDiagnostic;
use crate::engine::Engine;
use crate::graph::Syntax;
use crate::terms::{char_to_utf16_offset, utf16_to_char_offset};

struct OpenDocument {
    text: Rope,
    syntax: Syntax,
    version: Option<i32>,
}

impl OpenDocument {
    fn lines(&self) -> Vec<String> {
        buffer_lines(&self.text)
    }
}

/// The lines of a rope without their terminators.
pub fn buffer_lines(text: &Rope) -> Vec<String> {
    text.lines()
        .map(|line| {
            let line = line.to_string();
            line.trim_end_matches(['\n', '\r']).to_string()
        })
        .collect()
}

/// LSP positions count UTF-16 code units, the engine counts characters.
fn to_char_position(lines: &[String], position: Position) -> (usize, usize) {
    let line = position.line as usize;
    let character = position.character as usize;
    let character = lines
        .get(line)
        .map_or(character, |text| utf16_to_char_offset(text, character));
    (line, character)
}

fn to_lsp_diagnostic(lines: &[String], diagnostic: &ParseDiagnostic) -> Diagnostic {
    let column = lines
        .get(diagnostic.line)
        .map_or(diagnostic.column, |text| char_to_utf16_offset(text, diagnostic.column));
    ParseDiagnostic {
        column,
        ..diagnostic.clone()
    }
    .to_lsp()
}

pub struct Backend {
    client: Client,
    cache_dir: Option<PathBuf>,
    engine: Arc<Mutex<Option<Engine>>>,
    documents: RwLock<HashMap<Url, OpenDocument>>,
}

impl Backend {
    pub fn new(client: Client, cache_dir: Option<PathBuf>) -> Backend {
        Backend {
            client,
            cache_dir,
            engine: Arc::new(Mutex::new(None)),
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// Run `f` against the engine on the blocking pool. `None` before
    /// `initialize` succeeded.
    async fn with_engine<T, F>(&self, f: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Engine) -> T + Send + 'static,
    {
        let engine = self.engine.clone();
        tokio::task::spawn_blocking(move || engine.blocking_lock().as_mut().map(f))
            .await
            .map_err(|err| error!("Engine task failed: {}", err))
            .ok()
            .flatten()
    }

    async fn document_lines(&self, uri: &Url) -> Option<(Vec<String>, Syntax)> {
        self.documents
            .read()
            .await
            .get(uri)
            .map(|document| (document.lines(), document.syntax))
    }

    async fn store(&self, uri: Url, text: &str, syntax: Option<Syntax>, version: Option<i32>) {
        let mut documents = self.documents.write().await;
        let syntax = syntax
            .or_else(|| documents.get(&uri).map(|document| document.syntax))
            .or_else(|| uri.to_file_path().ok().and_then(|path| Syntax::from_path(&path)))
            .unwrap_or_else(|| Syntax::guess(text));
        documents.insert(
            uri,
            OpenDocument {
                text: Rope::from_str(text),
                syntax,
                version,
            },
        );
    }

    async fn publish_diagnostics(&self, uri: Url) {
        let Some((lines, syntax)) = self.document_lines(&uri).await else {
            return;
        };
        let version = self
            .documents
            .read()
            .await
            .get(&uri)
            .and_then(|document| document.version);

        let checked = lines.clone();
        let diagnostics = self
            .with_engine(move |engine| {
                if !engine.settings().diagnostics {
                    return None;
                }
                Some(engine.check(&checked, syntax))
            })
            .await
            .flatten();

        if let Some(diagnostics) = diagnostics {
            debug!("{} diagnostics for {}", diagnostics.len(), uri);
            let diagnostics = diagnostics
                .iter()
                .map(|d| to_lsp_diagnostic(&lines, d))
                .collect();
            self.client
                .publish_diagnostics(uri, diagnostics, version)
                .await;
        }
    }
}

#[allow(deprecated)]
fn root_dir(params: &InitializeParams) -> Option<PathBuf> {
    params
        .workspace_folders
        .as_ref()
        .and_then(|folders| folders.first())
        .map(|folder| &folder.uri)
        .or(params.root_uri.as_ref())
        .and_then(|uri| uri.to_file_path().ok())
}

#[async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let root = root_dir(&params).or_else(|| std::env::current_dir().ok());
        let mut settings = match &root {
            Some(root) => Settings::new(root).unwrap_or_else(|err| {
                error!("Ignoring invalid settings: {}", err);
                Settings::default()
            }),
            None => Settings::default(),
        };
        if let Some(cache_dir) = &self.cache_dir {
            settings.cache_dir = Some(cache_dir.to_string_lossy().into_owned());
        }

        let engine = tokio::task::spawn_blocking(move || Engine::new(settings))
            .await
            .map_err(|_| Error::internal_error())?
            .map_err(|err| {
                error!("Could not start: {:#}", err);
                Error::internal_error()
            })?;
        *self.engine.lock().await = Some(engine);

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(false),
                    trigger_characters: Some(vec![":".into(), "=".into(), " ".into()]),
                    ..Default::default()
                }),
                definition_provider: Some(OneOf::Left(true)),
                ..ServerCapabilities::default()
            },
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        info!("Server initialized");
        self.client
            .log_message(MessageType::INFO, "rdfls initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        // the blocking HTTP client must not be dropped on the executor
        let engine = self.engine.lock().await.take();
        let _ = tokio::task::spawn_blocking(move || drop(engine)).await;
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let document = params.text_document;
        let syntax = Syntax::from_language_id(&document.language_id);
        self.store(document.uri.clone(), &document.text, syntax, Some(document.version))
            .await;
        self.publish_diagnostics(document.uri).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let Some(change) = params.content_changes.into_iter().last() else {
            return;
        };
        let uri = params.text_document.uri;
        self.store(uri.clone(), &change.text, None, Some(params.text_document.version))
            .await;
        self.publish_diagnostics(uri).await;
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        if let Some(text) = params.text {
            let uri = params.text_document.uri.clone();
            self.store(uri, &text, None, None).await;
        }
        self.publish_diagnostics(params.text_document.uri).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.documents
            .write()
            .await
            .remove(&params.text_document.uri);
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let position = params.text_document_position.position;
        let Some((lines, syntax)) = self
            .document_lines(&params.text_document_position.text_document.uri)
            .await
        else {
            return Ok(None);
        };

        let (line, character) = to_char_position(&lines, position);
        let items = self
            .with_engine(move |engine| {
                engine
                    .completions(&lines, line, character, syntax)
                    .iter()
                    .map(|completion| completion.to_lsp())
                    .collect::<Vec<_>>()
            })
            .await;

        Ok(items.map(CompletionResponse::Array))
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let position = params.text_document_position_params.position;
        let Some((lines, _)) = self
            .document_lines(&params.text_document_position_params.text_document.uri)
            .await
        else {
            return Ok(None);
        };

        let (line, character) = to_char_position(&lines, position);
        let definition = self
            .with_engine(move |engine| engine.definition(&lines, line, character))
            .await
            .flatten();

        Ok(definition
            .and_then(|definition| definition.to_lsp())
            .map(GotoDefinitionResponse::Link))
    }
}
