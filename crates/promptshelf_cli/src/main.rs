//! Command-line front end for the promptshelf prompt/Lora library.

mod api;

use api::ApiClient;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use promptshelf_core::compose::{Composer, LlmTemplates, Side};
use promptshelf_core::config::{READER_ENV, SERVER_ENV};
use promptshelf_core::models::{
    Direction, ItemKey, LoraEntry, PromptDraft, PromptEntry, PromptKind, ReferenceItem,
};
use promptshelf_core::pagination::LoadOutcome;
use promptshelf_core::preferences::{Language, PreferenceKey, Preferences};
use promptshelf_core::selection::SelectionStore;
use promptshelf_core::store::{MemoryStore, RedbStore, SharedStore};
use promptshelf_core::view::{LibraryView, ViewOptions, VisibleItem};
use promptshelf_core::{Config, FilterSpec, SearchMode, ShelfError};
use serde::Serialize;
use std::error::Error;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type CliResult<T = ()> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "pshelf", about = "Prompt and Lora library CLI", version)]
struct Cli {
    /// Library backend URL
    #[arg(short, long, env = SERVER_ENV)]
    server: Option<String>,

    /// Reference reader URL
    #[arg(short, long, env = READER_ENV)]
    reader: Option<String>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    json: bool,

    /// Request timeout in seconds
    #[arg(short = 't', long)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Manage prompts
    #[command(subcommand)]
    Prompts(PromptCommand),
    /// Browse Loras
    #[command(subcommand)]
    Loras(LoraCommand),
    /// Browse reference images
    #[command(subcommand)]
    Refs(RefCommand),
    /// Edit the persisted selection of a list
    #[command(subcommand)]
    Select(SelectCommand),
    /// Render prompt text from the selected prompts and Loras
    Compose {
        /// Force every selected prompt onto one side
        #[arg(long, value_enum, default_value_t = SideArg::Auto)]
        side: SideArg,
    },
    /// Build an LLM request from the selection and a description
    Llm {
        /// What the image should depict
        demand: String,
        /// JSON file mapping language codes to templates
        #[arg(long)]
        templates: Option<std::path::PathBuf>,
        /// Template language (defaults to the host or stored language)
        #[arg(long, value_parser = parse_language)]
        lang: Option<Language>,
    },
    /// Toggle detailed rows for a list
    Detail {
        #[arg(value_enum)]
        list: ListArg,
    },
    /// Show or change preferences
    #[command(subcommand)]
    Prefs(PrefsCommand),
}

#[derive(Args, Clone, Default)]
struct FilterArgs {
    /// Only show this category
    #[arg(short, long, default_value = "")]
    category: String,
    /// Case-insensitive text filter
    #[arg(short, long, default_value = "")]
    query: String,
    /// Require a non-empty query to match
    #[arg(long)]
    exact: bool,
}

impl FilterArgs {
    fn spec(&self) -> FilterSpec {
        let mode = if self.exact {
            SearchMode::Exact
        } else {
            SearchMode::Fuzzy
        };
        FilterSpec::new(self.category.as_str(), self.query.as_str(), mode)
    }
}

#[derive(Subcommand)]
enum PromptCommand {
    List(FilterArgs),
    Add(PromptFields),
    /// Replace fields of the prompt at INDEX
    Update {
        index: usize,
        #[command(flatten)]
        fields: PromptFields,
    },
    /// Delete prompts by index, or the current selection when none are given
    Delete { indices: Vec<usize> },
}

#[derive(Args, Clone, Default)]
struct PromptFields {
    #[arg(short, long)]
    name: Option<String>,
    #[arg(long)]
    text: Option<String>,
    #[arg(short, long, value_parser = parse_direction)]
    direction: Option<Direction>,
    #[arg(short, long, value_parser = parse_kind)]
    kind: Option<PromptKind>,
    #[arg(long)]
    note: Option<String>,
}

impl PromptFields {
    fn apply(self, mut draft: PromptDraft) -> PromptDraft {
        if let Some(name) = self.name {
            draft.name = name;
        }
        if let Some(text) = self.text {
            draft.text = text;
        }
        if let Some(direction) = self.direction {
            draft.direction = direction;
        }
        if let Some(kind) = self.kind {
            draft.kind = kind;
        }
        if let Some(note) = self.note {
            draft.note = note;
        }
        draft
    }
}

#[derive(Args, Clone, Default)]
struct LoraListArgs {
    #[command(flatten)]
    filter: FilterArgs,
    /// Show every category and remember that choice
    #[arg(long, conflicts_with = "category")]
    all: bool,
}

/// Where the Lora category filter comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LoraCategory {
    /// Given on the command line (empty for `--all`); saved for next time.
    Chosen(String),
    Stored(String),
    /// Nothing saved yet: preselect the catalog's first category.
    CatalogDefault,
}

impl LoraListArgs {
    fn category(&self, stored: Option<String>) -> LoraCategory {
        if self.all {
            return LoraCategory::Chosen(String::new());
        }
        let requested = self.filter.category.trim();
        if !requested.is_empty() {
            return LoraCategory::Chosen(requested.to_string());
        }
        match stored {
            Some(stored) => LoraCategory::Stored(stored),
            None => LoraCategory::CatalogDefault,
        }
    }
}

#[derive(Subcommand)]
enum LoraCommand {
    /// List Loras; the category defaults to the last one used
    List(LoraListArgs),
    /// Rescan metadata of every Lora
    Refresh,
}

#[derive(Subcommand)]
enum RefCommand {
    Categories,
    List {
        #[arg(short, long, default_value = "")]
        category: String,
        #[arg(short, long, default_value = "")]
        search: String,
        /// Pages to load
        #[arg(short, long, default_value = "1")]
        pages: usize,
    },
}

#[derive(Subcommand)]
enum SelectCommand {
    /// Toggle keys (indices for prompts/Loras, image URLs for references)
    Toggle {
        #[arg(value_enum)]
        list: ListArg,
        #[arg(required = true)]
        keys: Vec<String>,
    },
    Clear {
        #[arg(value_enum)]
        list: ListArg,
    },
    Show {
        #[arg(value_enum)]
        list: ListArg,
    },
    /// Drop selected keys that no longer exist in the list
    Prune {
        #[arg(value_enum)]
        list: ListArg,
    },
}

#[derive(Subcommand)]
enum PrefsCommand {
    Show,
    Set { key: String, value: String },
    /// Switch between light and dark
    Theme {
        /// Toggle the reference reader's theme instead
        #[arg(long)]
        reader: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ListArg {
    Prompts,
    Loras,
    References,
}

impl ListArg {
    fn options(self, page_size: usize) -> ViewOptions {
        match self {
            Self::Prompts => ViewOptions::prompts(page_size),
            Self::Loras => ViewOptions::loras(page_size),
            Self::References => ViewOptions::references(page_size),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SideArg {
    Auto,
    Positive,
    Negative,
}

impl Commands {
    fn label(&self) -> &'static str {
        match self {
            Self::Completions { .. } => "Completions",
            Self::Prompts(_) => "Prompts",
            Self::Loras(_) => "Loras",
            Self::Refs(_) => "References",
            Self::Select(_) => "Select",
            Self::Compose { .. } => "Compose",
            Self::Llm { .. } => "LLM",
            Self::Detail { .. } => "Detail",
            Self::Prefs(_) => "Preferences",
        }
    }
}

fn parse_direction(value: &str) -> Result<Direction, String> {
    Direction::parse(value).ok_or_else(|| format!("unknown direction '{}'", value))
}

fn parse_kind(value: &str) -> Result<PromptKind, String> {
    PromptKind::parse(value).ok_or_else(|| format!("unknown prompt type '{}'", value))
}

fn parse_language(value: &str) -> Result<Language, String> {
    Language::parse(value)
        .or_else(|| Language::from_host(value))
        .ok_or_else(|| format!("unknown language '{}'", value))
}

/// Parse a selection key: positional for prompts and Loras, verbatim for
/// references.
fn parse_key(list: ListArg, raw: &str) -> Result<ItemKey, String> {
    match list {
        ListArg::References => Ok(ItemKey::Id(raw.to_string())),
        ListArg::Prompts | ListArg::Loras => raw
            .trim()
            .parse::<usize>()
            .map(ItemKey::Index)
            .map_err(|_| format!("'{}' is not an index", raw)),
    }
}

/// Host language from `LANG`, without the encoding suffix.
fn host_language() -> Option<String> {
    std::env::var("LANG")
        .ok()
        .and_then(|value| value.split('.').next().map(str::to_string))
        .filter(|value| !value.is_empty())
}

fn open_store(config: &Config) -> Result<SharedStore, ShelfError> {
    if config.read_only {
        debug!("read-only mode; preferences kept in memory");
        return Ok(Arc::new(MemoryStore::default()));
    }
    Ok(Arc::new(RedbStore::open(&config.store_path)?))
}

fn selection_marker(selected: bool) -> &'static str {
    if selected {
        "*"
    } else {
        " "
    }
}

#[derive(Serialize)]
struct Row<'a, T> {
    key: &'a ItemKey,
    selected: bool,
    #[serde(flatten)]
    item: &'a T,
}

fn format_json_rows<T: Serialize>(items: &[VisibleItem<T>]) -> Result<String, String> {
    let rows: Vec<Row<'_, T>> = items
        .iter()
        .map(|visible| Row {
            key: &visible.key,
            selected: visible.selected,
            item: &visible.item,
        })
        .collect();
    serde_json::to_string_pretty(&rows).map_err(|err| format!("response encoding error: {}", err))
}

fn format_prompt_rows(
    items: &[VisibleItem<PromptEntry>],
    json: bool,
    detail: bool,
) -> Result<String, String> {
    if json {
        return format_json_rows(items);
    }
    let mut rows = Vec::with_capacity(items.len());
    for visible in items {
        let prompt = &visible.item;
        rows.push(format!(
            "{} {:<5} {:<24} {:<4} {:<4} {}",
            selection_marker(visible.selected),
            visible.key.to_string(),
            prompt.name,
            prompt.kind.label(),
            prompt.direction.label(),
            prompt.text
        ));
        if detail {
            if let Some(note) = prompt.note.as_deref().filter(|note| !note.is_empty()) {
                rows.push(format!("        note: {}", note));
            }
        }
    }
    Ok(rows.join("\n"))
}

fn format_lora_rows(
    items: &[VisibleItem<LoraEntry>],
    json: bool,
    detail: bool,
) -> Result<String, String> {
    if json {
        return format_json_rows(items);
    }
    let mut rows = Vec::with_capacity(items.len());
    for visible in items {
        let lora = &visible.item;
        rows.push(format!(
            "{} {:<5} {:<28} {:<12} {}",
            selection_marker(visible.selected),
            visible.key.to_string(),
            lora.name,
            lora.category,
            lora.trigger_text()
        ));
        if detail {
            rows.push(format!("        file: {}", lora.filename));
            if let Some(base) = &lora.base_model {
                rows.push(format!("        base model: {}", base));
            }
            if let Some(kind) = lora.preview_kind() {
                rows.push(format!("        preview: {:?}", kind).to_lowercase());
            }
            if let Some(notes) = lora.notes.as_deref().filter(|notes| !notes.is_empty()) {
                rows.push(format!("        notes: {}", notes));
            }
        }
    }
    Ok(rows.join("\n"))
}

fn format_reference_rows(
    items: &[VisibleItem<ReferenceItem>],
    json: bool,
    detail: bool,
) -> Result<String, String> {
    if json {
        return format_json_rows(items);
    }
    let mut rows = Vec::with_capacity(items.len());
    for visible in items {
        let reference = &visible.item;
        rows.push(format!(
            "{} {:<24} {:<24} {}",
            selection_marker(visible.selected),
            reference.lora_name,
            reference.summary(),
            reference.image_url
        ));
        if detail {
            rows.push(format!("        prompt: {}", reference.prompt));
            if !reference.negative_prompt.is_empty() {
                rows.push(format!("        negative: {}", reference.negative_prompt));
            }
            let mut params = Vec::new();
            if let Some(steps) = reference.steps {
                params.push(format!("steps {}", steps));
            }
            if let Some(sampler) = &reference.sampler {
                params.push(format!("sampler {}", sampler));
            }
            if let Some(cfg) = reference.cfg_scale {
                params.push(format!("cfg {}", cfg));
            }
            if let Some(seed) = reference.seed {
                params.push(format!("seed {}", seed));
            }
            if !params.is_empty() {
                rows.push(format!("        {}", params.join(", ")));
            }
        }
    }
    Ok(rows.join("\n"))
}

fn format_composer(composer: &Composer, json: bool) -> Result<String, String> {
    if json {
        return serde_json::to_string_pretty(&serde_json::json!({
            "tags": composer,
            "positive": composer.render(Side::Positive),
            "negative": composer.render(Side::Negative),
        }))
        .map_err(|err| format!("response encoding error: {}", err));
    }
    Ok(format!(
        "Positive:\n{}\n\nNegative:\n{}",
        composer.render(Side::Positive),
        composer.render(Side::Negative)
    ))
}

fn print_output(output: String) {
    if !output.is_empty() {
        println!("{}", output);
    }
}

/// Report a load that did not produce items.
fn ensure_loaded(outcome: LoadOutcome) -> Result<(), ShelfError> {
    match outcome {
        LoadOutcome::Failed(err) => Err(err),
        LoadOutcome::Loaded { .. }
        | LoadOutcome::Exhausted
        | LoadOutcome::Busy
        | LoadOutcome::Discarded => Ok(()),
    }
}

struct App {
    config: Config,
    client: ApiClient,
    preferences: Preferences,
    json: bool,
}

impl App {
    fn view<T>(&self, list: ListArg) -> LibraryView<T, ApiClient>
    where
        T: Clone + promptshelf_core::models::LibraryItem,
        ApiClient: promptshelf_core::pagination::PageSource<T>,
    {
        LibraryView::new(
            list.options(self.config.page_size),
            self.client.clone(),
            self.preferences.clone(),
        )
    }

    async fn loaded_view<T>(&self, list: ListArg) -> CliResult<LibraryView<T, ApiClient>>
    where
        T: Clone + promptshelf_core::models::LibraryItem,
        ApiClient: promptshelf_core::pagination::PageSource<T>,
    {
        let view = self.view(list);
        ensure_loaded(view.load_more().await)?;
        Ok(view)
    }

    async fn prompts(&self, command: PromptCommand) -> CliResult {
        match command {
            PromptCommand::List(filter) => {
                let mut view = self.loaded_view::<PromptEntry>(ListArg::Prompts).await?;
                view.set_filter(filter.spec());
                let output = format_prompt_rows(&view.visible(), self.json, view.detail_mode())?;
                print_output(output);
            }
            PromptCommand::Add(fields) => {
                let entry = self
                    .client
                    .add_prompt(fields.apply(PromptDraft::default()))
                    .await?;
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&entry)?);
                } else {
                    println!("Added: {}", entry.name);
                }
            }
            PromptCommand::Update { index, fields } => {
                let prompts = self.client.list_prompts().await?;
                let existing = prompts.get(index).ok_or(ShelfError::NotFound)?;
                let entry = self
                    .client
                    .update_prompt(index, fields.apply(PromptDraft::from(existing)))
                    .await?;
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&entry)?);
                } else {
                    println!("Updated #{}: {}", index, entry.name);
                }
            }
            PromptCommand::Delete { indices } => {
                let mut selection =
                    SelectionStore::load("prompts", self.preferences.store().clone());
                let targets = if indices.is_empty() {
                    selection.deletion_order()
                } else {
                    indices
                };
                if targets.is_empty() {
                    return Err(ShelfError::InvalidInput("nothing selected".to_string()).into());
                }
                let deleted = self.client.delete_prompts(&targets).await?;
                selection.clear()?;
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&deleted)?);
                } else {
                    println!("Deleted {} prompt(s)", deleted.len());
                }
            }
        }
        Ok(())
    }

    async fn loras(&self, command: LoraCommand) -> CliResult {
        match command {
            LoraCommand::List(args) => {
                let mut view = self.loaded_view::<LoraEntry>(ListArg::Loras).await?;
                let mut spec = args.filter.spec();
                spec.category = match args.category(self.preferences.stored_lora_category()) {
                    LoraCategory::Chosen(category) => {
                        self.preferences.set_lora_category(&category)?;
                        category
                    }
                    LoraCategory::Stored(category) => category,
                    LoraCategory::CatalogDefault => {
                        let catalog = self.client.lora_catalog().await?;
                        catalog.default_category().unwrap_or_default().to_string()
                    }
                };
                view.set_filter(spec);
                let output = format_lora_rows(&view.visible(), self.json, view.detail_mode())?;
                print_output(output);
            }
            LoraCommand::Refresh => {
                let report = self.client.refresh_loras().await?;
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else if report.success {
                    println!("{}", report.message);
                } else {
                    return Err(ShelfError::InvalidInput(report.message).into());
                }
            }
        }
        Ok(())
    }

    async fn refs(&self, command: RefCommand) -> CliResult {
        match command {
            RefCommand::Categories => {
                let categories = self.client.reference_categories().await?;
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&categories)?);
                } else {
                    print_output(categories.join("\n"));
                }
            }
            RefCommand::List {
                category,
                search,
                pages,
            } => {
                let mut view = self.view::<ReferenceItem>(ListArg::References);
                view.set_filter(FilterSpec::new(category, search, SearchMode::Fuzzy));
                ensure_loaded(view.list().load_pages(&view.query(), pages.max(1)).await)?;
                let output =
                    format_reference_rows(&view.visible(), self.json, view.detail_mode())?;
                print_output(output);
                let state = view.state();
                if !self.json && state.shows_load_more() {
                    eprintln!(
                        "{} of {} loaded; {} more (use --pages)",
                        state.loaded,
                        state.total,
                        state.remaining()
                    );
                }
            }
        }
        Ok(())
    }

    /// Load every page of `list` and drop selected keys that are gone.
    async fn prune<T>(&self, list: ListArg) -> CliResult<usize>
    where
        T: Clone + promptshelf_core::models::LibraryItem,
        ApiClient: promptshelf_core::pagination::PageSource<T>,
    {
        let mut view = self.view::<T>(list);
        ensure_loaded(view.list().load_pages(&view.query(), usize::MAX).await)?;
        Ok(view.prune_selection()?)
    }

    fn toggle_detail<T>(&self, list: ListArg) -> CliResult<bool>
    where
        T: Clone + promptshelf_core::models::LibraryItem,
        ApiClient: promptshelf_core::pagination::PageSource<T>,
    {
        Ok(self.view::<T>(list).toggle_detail_mode()?)
    }

    async fn select(&self, command: SelectCommand) -> CliResult {
        let store = self.preferences.store().clone();
        match command {
            SelectCommand::Toggle { list, keys } => {
                let mut selection = SelectionStore::load(&list.options(1).name, store);
                for raw in keys {
                    let key = parse_key(list, &raw)?;
                    let selected = selection.toggle(key.clone())?;
                    if !self.json {
                        println!("{} {}", if selected { "selected" } else { "deselected" }, key);
                    }
                }
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&selection.keys().collect::<Vec<_>>())?);
                }
            }
            SelectCommand::Clear { list } => {
                SelectionStore::load(&list.options(1).name, store).clear()?;
            }
            SelectCommand::Prune { list } => {
                let removed = match list {
                    ListArg::Prompts => self.prune::<PromptEntry>(list).await?,
                    ListArg::Loras => self.prune::<LoraEntry>(list).await?,
                    ListArg::References => self.prune::<ReferenceItem>(list).await?,
                };
                if self.json {
                    println!("{}", serde_json::json!({ "removed": removed }));
                } else {
                    println!("Removed {} stale key(s)", removed);
                }
            }
            SelectCommand::Show { list } => {
                let selection = SelectionStore::load(&list.options(1).name, store);
                if self.json {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&serde_json::json!({
                            "keys": selection.keys().collect::<Vec<_>>(),
                            "actions": {
                                "edit": selection.actions().edit,
                                "delete": selection.actions().delete,
                                "deselect": selection.actions().deselect,
                            }
                        }))?
                    );
                } else {
                    let keys: Vec<String> = selection.keys().map(ToString::to_string).collect();
                    print_output(keys.join("\n"));
                }
            }
        }
        Ok(())
    }

    /// Composer holding the selected prompts and Loras, plus the prompt list.
    async fn compose_selection(&self, side: SideArg) -> CliResult<(Composer, Vec<PromptEntry>)> {
        let prompts = self.loaded_view::<PromptEntry>(ListArg::Prompts).await?;
        let loras = self.loaded_view::<LoraEntry>(ListArg::Loras).await?;

        let selected_prompts = prompts.selected_items();
        let selected_prompts = selected_prompts
            .iter()
            .filter_map(|(key, entry)| key.index().map(|index| (index, entry)));
        let mut composer = Composer::new();
        match side {
            SideArg::Auto => composer.add_auto(selected_prompts),
            SideArg::Positive => composer.add_to(Side::Positive, selected_prompts),
            SideArg::Negative => composer.add_to(Side::Negative, selected_prompts),
        };

        let selected_loras = loras.selected_items();
        composer.add_loras(
            selected_loras
                .iter()
                .filter_map(|(key, entry)| key.index().map(|index| (index, entry))),
        );
        Ok((composer, prompts.list().items()))
    }

    async fn llm(
        &self,
        demand: &str,
        templates: Option<std::path::PathBuf>,
        lang: Option<Language>,
    ) -> CliResult {
        let templates = match templates {
            Some(path) => LlmTemplates::from_json(&std::fs::read_to_string(path)?)?,
            None => LlmTemplates::builtin(),
        };
        let language =
            lang.unwrap_or_else(|| self.preferences.language(host_language().as_deref()));
        let (composer, prompts) = self.compose_selection(SideArg::Auto).await?;
        let request = templates.build(language, &composer, &prompts, demand)?;
        println!("{}", request);
        Ok(())
    }

    fn prefs(&self, command: PrefsCommand) -> CliResult {
        match command {
            PrefsCommand::Show => {
                let snapshot = self.preferences.snapshot(host_language().as_deref());
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&snapshot)?);
                } else {
                    println!("{}: {}", PreferenceKey::Theme, snapshot.theme.as_str());
                    println!(
                        "{}: {}",
                        PreferenceKey::ReaderTheme,
                        snapshot.reader_theme.as_str()
                    );
                    println!("{}: {}", PreferenceKey::Language, snapshot.language.as_str());
                    println!("{}: {}", PreferenceKey::ActiveTab, snapshot.active_tab.as_str());
                    println!("{}: {}", PreferenceKey::PanelWidth, snapshot.panel_width);
                    println!(
                        "{}: {}",
                        PreferenceKey::PromptDetailMode,
                        snapshot.prompt_detail_mode
                    );
                    println!("{}: {}", PreferenceKey::LoraDetailMode, snapshot.lora_detail_mode);
                    println!(
                        "{}: {}",
                        PreferenceKey::ReaderDetailMode,
                        snapshot.reader_detail_mode
                    );
                    println!("{}: {}", PreferenceKey::LoraCategory, snapshot.lora_category);
                }
            }
            PrefsCommand::Set { key, value } => {
                let key = PreferenceKey::parse(&key).ok_or_else(|| {
                    ShelfError::InvalidInput(format!("unknown preference '{}'", key))
                })?;
                self.preferences.set_from_str(key, &value)?;
            }
            PrefsCommand::Theme { reader } => {
                let theme = self.preferences.toggle_theme(reader)?;
                if self.json {
                    println!("{}", serde_json::to_string(&theme)?);
                } else {
                    println!("{}", theme.as_str());
                }
            }
        }
        Ok(())
    }

    async fn run(&self, command: Commands) -> CliResult {
        match command {
            Commands::Completions { .. } => Ok(()),
            Commands::Prompts(command) => self.prompts(command).await,
            Commands::Loras(command) => self.loras(command).await,
            Commands::Refs(command) => self.refs(command).await,
            Commands::Select(command) => self.select(command).await,
            Commands::Compose { side } => {
                let (composer, _) = self.compose_selection(side).await?;
                print_output(format_composer(&composer, self.json)?);
                Ok(())
            }
            Commands::Llm {
                demand,
                templates,
                lang,
            } => self.llm(&demand, templates, lang).await,
            Commands::Detail { list } => {
                let enabled = match list {
                    ListArg::Prompts => self.toggle_detail::<PromptEntry>(list)?,
                    ListArg::Loras => self.toggle_detail::<LoraEntry>(list)?,
                    ListArg::References => self.toggle_detail::<ReferenceItem>(list)?,
                };
                if self.json {
                    println!("{}", serde_json::json!({ "detail": enabled }));
                } else {
                    println!("detail mode {}", if enabled { "on" } else { "off" });
                }
                Ok(())
            }
            Commands::Prefs(command) => self.prefs(command),
        }
    }
}

#[tokio::main]
async fn main() -> CliResult {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let Cli {
        server,
        reader,
        json,
        timeout,
        command,
    } = Cli::parse();

    if let Commands::Completions { shell } = &command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let mut config = Config::from_env();
    if let Some(server) = server.filter(|value| !value.trim().is_empty()) {
        config.server_url = server.trim().to_string();
    }
    if let Some(reader) = reader.filter(|value| !value.trim().is_empty()) {
        config.reader_url = reader.trim().to_string();
    }
    if let Some(timeout) = timeout {
        config.timeout_secs = timeout;
    }

    let client = ApiClient::new(
        &config.server_url,
        &config.reader_url,
        Duration::from_secs(config.timeout_secs),
    )?;
    let preferences = Preferences::new(open_store(&config)?);
    let app = App {
        config,
        client,
        preferences,
        json,
    };

    let label = command.label();
    if let Err(err) = app.run(command).await {
        eprintln!("{} failed: {}", label, err);
        std::process::exit(1);
    }
    Ok(())
}
