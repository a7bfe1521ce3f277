use icu_locid::{Locale, ParserError as LocaleParserError};
use icu_plurals::{PluralCategory as IcuPluralCategory, PluralRules};
use serde::Deserialize;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_LOCALE_CODE: &str = "en-US";

enum Builtin {
    Simple(&'static str),
    Plural(&'static [(&'static str, &'static str)]),
}

struct BuiltinLocale {
    code: &'static str,
    display_name: &'static str,
    strings: &'static [(&'static str, Builtin)],
}

static ENGLISH: BuiltinLocale = BuiltinLocale {
    code: DEFAULT_LOCALE_CODE,
    display_name: "English",
    strings: &[
        ("app.title", Builtin::Simple("Universal Print Station Pro")),
        ("queue.title", Builtin::Simple("PRINT QUEUE")),
        ("queue.drop_hint", Builtin::Simple("Drop files here or click Add")),
        ("queue.add", Builtin::Simple("+")),
        ("queue.remove", Builtin::Simple("×")),
        ("preview.title", Builtin::Simple("Preview")),
        ("preview.title_with_file", Builtin::Simple("Preview: {0}")),
        ("preview.error", Builtin::Simple("Preview Error: {0}")),
        ("preview.empty", Builtin::Simple("Select a file to preview")),
        ("params.title", Builtin::Simple("PARAMETERS")),
        ("params.printer", Builtin::Simple("Target Printer:")),
        ("params.paper", Builtin::Simple("Media Size:")),
        ("params.copies", Builtin::Simple("Copy Count:")),
        ("params.fit", Builtin::Simple("Scale to fit page")),
        ("params.no_printers", Builtin::Simple("No printers found")),
        ("print.execute", Builtin::Simple("EXECUTE PRINT")),
        ("print.busy", Builtin::Simple("...")),
        ("language.label", Builtin::Simple("Language")),
        ("status.ready", Builtin::Simple("Ready")),
        ("status.error", Builtin::Simple("Error: {0}")),
        (
            "status.batch_done",
            Builtin::Plural(&[
                ("one", "{count} file printed"),
                ("other", "{count} files printed"),
            ]),
        ),
        (
            "status.batch_failed",
            Builtin::Plural(&[
                ("one", "{count} file failed"),
                ("other", "{count} files failed"),
            ]),
        ),
    ],
};

static RUSSIAN: BuiltinLocale = BuiltinLocale {
    code: "ru-RU",
    display_name: "Русский",
    strings: &[
        ("app.title", Builtin::Simple("Универсальная Станция Печати")),
        ("queue.title", Builtin::Simple("ОЧЕРЕДЬ ПЕЧАТИ")),
        (
            "queue.drop_hint",
            Builtin::Simple("Перетащите файлы сюда или Добавьте"),
        ),
        ("preview.title", Builtin::Simple("Предпросмотр")),
        ("preview.title_with_file", Builtin::Simple("Предпросмотр: {0}")),
        ("preview.error", Builtin::Simple("Ошибка предпросмотра: {0}")),
        ("preview.empty", Builtin::Simple("Выберите файл для предпросмотра")),
        ("params.title", Builtin::Simple("ПАРАМЕТРЫ")),
        ("params.printer", Builtin::Simple("Принтер:")),
        ("params.paper", Builtin::Simple("Размер бумаги:")),
        ("params.copies", Builtin::Simple("Количество копий:")),
        ("params.fit", Builtin::Simple("Масштабировать в лист")),
        ("params.no_printers", Builtin::Simple("Принтеры не найдены")),
        ("print.execute", Builtin::Simple("ЗАПУСТИТЬ ПЕЧАТЬ")),
        ("language.label", Builtin::Simple("Язык")),
        ("status.ready", Builtin::Simple("Готов")),
        ("status.error", Builtin::Simple("Ошибка: {0}")),
        (
            "status.batch_done",
            Builtin::Plural(&[
                ("one", "Напечатан {count} файл"),
                ("few", "Напечатано {count} файла"),
                ("many", "Напечатано {count} файлов"),
                ("other", "Напечатано {count} файла"),
            ]),
        ),
        (
            "status.batch_failed",
            Builtin::Plural(&[
                ("one", "Ошибка в {count} файле"),
                ("other", "Ошибки в {count} файлах"),
            ]),
        ),
    ],
};

static BUILTIN_LOCALES: [&BuiltinLocale; 2] = [&ENGLISH, &RUSSIAN];

/// Index of the English catalog every lookup falls back to.
const FALLBACK: usize = 0;

/// CLDR plural category of one message form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum PluralForm {
    Zero,
    One,
    Two,
    Few,
    Many,
    Other,
}

impl PluralForm {
    fn from_cldr(name: &str) -> Option<Self> {
        Some(match name {
            "zero" => Self::Zero,
            "one" => Self::One,
            "two" => Self::Two,
            "few" => Self::Few,
            "many" => Self::Many,
            "other" => Self::Other,
            _ => return None,
        })
    }
}

impl From<IcuPluralCategory> for PluralForm {
    fn from(category: IcuPluralCategory) -> Self {
        match category {
            IcuPluralCategory::Zero => Self::Zero,
            IcuPluralCategory::One => Self::One,
            IcuPluralCategory::Two => Self::Two,
            IcuPluralCategory::Few => Self::Few,
            IcuPluralCategory::Many => Self::Many,
            IcuPluralCategory::Other => Self::Other,
        }
    }
}

#[derive(Debug, Clone)]
enum Message {
    Simple(String),
    Plural(BTreeMap<PluralForm, String>),
}

impl Message {
    /// Picks the template for `count`; plural messages always carry `other`.
    fn template(&self, rules: Option<&PluralRules>, count: Option<u64>) -> &str {
        match self {
            Message::Simple(text) => text.as_str(),
            Message::Plural(forms) => {
                let form = match (rules, count) {
                    (Some(rules), Some(count)) => PluralForm::from(rules.category_for(count)),
                    (None, Some(1)) => PluralForm::One,
                    _ => PluralForm::Other,
                };
                forms
                    .get(&form)
                    .or_else(|| forms.get(&PluralForm::Other))
                    .map(String::as_str)
                    .unwrap_or_default()
            }
        }
    }
}

/// Values substituted into `{0}`, `{1}` … and `{count}` placeholders.
/// 替換 `{0}`、`{1}` 與 `{count}` 佔位符的參數。
#[derive(Debug, Clone, Copy)]
pub struct LocalizationParams<'a> {
    count: Option<u64>,
    positional: &'a [&'a str],
}

impl<'a> LocalizationParams<'a> {
    pub fn new(positional: &'a [&'a str]) -> Self {
        Self {
            count: None,
            positional,
        }
    }
}

impl LocalizationParams<'static> {
    const NONE: Self = Self {
        count: None,
        positional: &[],
    };

    /// Count for plural selection and the `{count}` placeholder.
    pub fn count_only(count: u64) -> Self {
        Self {
            count: Some(count),
            positional: &[],
        }
    }
}

#[derive(Debug, Error)]
pub enum LocalizationError {
    #[error("failed to read locale pack {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("locale pack {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("locale {0} is provided by more than one pack")]
    DuplicateLocale(String),
    #[error("plural message '{key}' in {locale} has no 'other' form")]
    PluralMissingOther { locale: String, key: String },
    #[error("plural message '{key}' in {locale} uses unknown category '{category}'")]
    UnknownPluralCategory {
        locale: String,
        key: String,
        category: String,
    },
    #[error("message '{key}' in {locale} has unsupported type '{kind}'")]
    UnsupportedMessageType {
        locale: String,
        key: String,
        kind: String,
    },
    #[error("invalid locale identifier '{locale}': {reason}")]
    InvalidLocale {
        locale: String,
        reason: LocaleParserError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleSummary {
    pub code: String,
    pub display_name: String,
}

#[derive(Debug, Clone)]
struct Catalog {
    summary: LocaleSummary,
    rules: Option<Arc<PluralRules>>,
    messages: HashMap<String, Message>,
    from_pack: bool,
}

/// JSON locale pack: `{ "locale", "display_name", "strings" }`.
#[derive(Debug, Deserialize)]
struct LocalePack {
    locale: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    strings: HashMap<String, PackEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PackEntry {
    Text(String),
    Typed(TypedEntry),
}

#[derive(Debug, Deserialize)]
struct TypedEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(flatten)]
    forms: HashMap<String, String>,
}

/// Label catalogs for the UI, with English as the fallback language.
/// （介面標籤目錄，以英文作為回退語系。）
#[derive(Debug, Clone)]
pub struct LocalizationManager {
    catalogs: Vec<Catalog>,
    active: usize,
}

impl Default for LocalizationManager {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LocalizationManager {
    /// Built-in English and Russian labels, English active.
    /// （內建英文與俄文標籤，預設啟用英文。）
    pub fn builtin() -> Self {
        Self {
            catalogs: BUILTIN_LOCALES.iter().map(|locale| builtin_catalog(locale)).collect(),
            active: FALLBACK,
        }
    }

    /// Adds the `*.json` packs found in `path` to the built-in catalogs and
    /// activates `active_locale` when it is available. A missing directory
    /// adds nothing.
    /// （從指定目錄載入額外語系包，並啟用指定語系。）
    pub fn load_from_dir(
        path: impl AsRef<Path>,
        active_locale: &str,
    ) -> Result<Self, LocalizationError> {
        Self::load_from_dirs(std::iter::once(path), active_locale)
    }

    /// Same as [`Self::load_from_dir`] over several directories, in order.
    pub fn load_from_dirs<I, P>(paths: I, active_locale: &str) -> Result<Self, LocalizationError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut manager = Self::builtin();
        for dir in paths {
            for pack in read_packs(dir.as_ref())? {
                manager.install(pack)?;
            }
        }
        manager.set_active_by_code(active_locale);
        Ok(manager)
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_code(&self) -> &str {
        &self.catalogs[self.active].summary.code
    }

    /// Available locales in catalog order: built-ins first, then packs.
    pub fn locale_summaries(&self) -> Vec<LocaleSummary> {
        self.catalogs
            .iter()
            .map(|catalog| catalog.summary.clone())
            .collect()
    }

    pub fn set_active_by_index(&mut self, index: usize) -> bool {
        let valid = index < self.catalogs.len();
        if valid {
            self.active = index;
        }
        valid
    }

    /// Switches the active locale by code; a bare language such as `ru`
    /// selects the first catalog of that language.
    /// （依語系代碼切換；僅含語言時選取第一個相符的目錄。）
    pub fn set_active_by_code(&mut self, code: &str) -> bool {
        let found = self.find_locale(code);
        if let Some(index) = found {
            self.active = index;
        }
        found.is_some()
    }

    /// Label for `key`; falls back to English, then to the key itself.
    /// （取得標籤，缺少時回退至英文，再回退至鍵名。）
    pub fn text<'a>(&'a self, key: &'a str) -> Cow<'a, str> {
        self.text_with_params(key, &LocalizationParams::NONE)
    }

    pub fn text_with_params<'a>(
        &'a self,
        key: &'a str,
        params: &LocalizationParams<'_>,
    ) -> Cow<'a, str> {
        match self.lookup(key) {
            Some((message, rules)) => fill_placeholders(message.template(rules, params.count), params),
            None => Cow::Borrowed(key),
        }
    }

    pub fn fallback_code(&self) -> &str {
        &self.catalogs[FALLBACK].summary.code
    }

    fn lookup(&self, key: &str) -> Option<(&Message, Option<&PluralRules>)> {
        [self.active, FALLBACK].into_iter().find_map(|index| {
            let catalog = &self.catalogs[index];
            let message = catalog.messages.get(key)?;
            Some((message, catalog.rules.as_deref()))
        })
    }

    fn find_locale(&self, code: &str) -> Option<usize> {
        let exact = self
            .catalogs
            .iter()
            .position(|catalog| catalog.summary.code.eq_ignore_ascii_case(code));
        if exact.is_some() {
            return exact;
        }
        let language = Locale::from_str(code).ok()?.id.language;
        self.catalogs.iter().position(|catalog| {
            Locale::from_str(&catalog.summary.code)
                .is_ok_and(|locale| locale.id.language == language)
        })
    }

    /// A pack may patch a built-in catalog once; any other repeat is an error.
    fn install(&mut self, pack: LocalePack) -> Result<(), LocalizationError> {
        let messages = parse_messages(&pack.locale, pack.strings)?;
        let rules = plural_rules_for(&pack.locale)?;
        let existing = self
            .catalogs
            .iter()
            .position(|catalog| catalog.summary.code == pack.locale);

        match existing {
            Some(index) if !self.catalogs[index].from_pack => {
                let catalog = &mut self.catalogs[index];
                catalog.messages.extend(messages);
                if let Some(name) = pack.display_name {
                    catalog.summary.display_name = name;
                }
                catalog.from_pack = true;
            }
            Some(_) => return Err(LocalizationError::DuplicateLocale(pack.locale)),
            None => self.catalogs.push(Catalog {
                summary: LocaleSummary {
                    display_name: pack.display_name.unwrap_or_else(|| pack.locale.clone()),
                    code: pack.locale,
                },
                rules,
                messages,
                from_pack: true,
            }),
        }
        Ok(())
    }
}

fn read_packs(dir: &Path) -> Result<Vec<LocalePack>, LocalizationError> {
    let dir_error = |source: io::Error| LocalizationError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(dir_error(err)),
    };

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(dir_error)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            let contents = fs::read_to_string(&path).map_err(|source| LocalizationError::Io {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str(&contents)
                .map_err(|source| LocalizationError::Parse { path, source })
        })
        .collect()
}

fn builtin_catalog(locale: &BuiltinLocale) -> Catalog {
    let messages = locale
        .strings
        .iter()
        .map(|(key, text)| {
            let message = match text {
                Builtin::Simple(value) => Message::Simple(value.to_string()),
                Builtin::Plural(forms) => Message::Plural(
                    forms
                        .iter()
                        .filter_map(|(name, template)| {
                            Some((PluralForm::from_cldr(name)?, template.to_string()))
                        })
                        .collect(),
                ),
            };
            (key.to_string(), message)
        })
        .collect();
    Catalog {
        summary: LocaleSummary {
            code: locale.code.to_string(),
            display_name: locale.display_name.to_string(),
        },
        rules: plural_rules_for(locale.code).ok().flatten(),
        messages,
        from_pack: false,
    }
}

/// Cardinal rules for `code`; `None` when ICU has no data for the language.
fn plural_rules_for(code: &str) -> Result<Option<Arc<PluralRules>>, LocalizationError> {
    let locale = Locale::from_str(code).map_err(|reason| LocalizationError::InvalidLocale {
        locale: code.to_string(),
        reason,
    })?;
    Ok(PluralRules::try_new_cardinal(&locale.into())
        .ok()
        .map(Arc::new))
}

fn parse_messages(
    locale: &str,
    entries: HashMap<String, PackEntry>,
) -> Result<HashMap<String, Message>, LocalizationError> {
    entries
        .into_iter()
        .map(|(key, entry)| {
            let message = match entry {
                PackEntry::Text(text) => Message::Simple(text),
                PackEntry::Typed(typed) if typed.kind == "plural" => {
                    Message::Plural(parse_plural(locale, &key, typed.forms)?)
                }
                PackEntry::Typed(typed) => {
                    return Err(LocalizationError::UnsupportedMessageType {
                        locale: locale.to_string(),
                        key,
                        kind: typed.kind,
                    })
                }
            };
            Ok((key, message))
        })
        .collect()
}

fn parse_plural(
    locale: &str,
    key: &str,
    forms: HashMap<String, String>,
) -> Result<BTreeMap<PluralForm, String>, LocalizationError> {
    let parsed = forms
        .into_iter()
        .map(|(category, template)| match PluralForm::from_cldr(&category) {
            Some(form) => Ok((form, template)),
            None => Err(LocalizationError::UnknownPluralCategory {
                locale: locale.to_string(),
                key: key.to_string(),
                category,
            }),
        })
        .collect::<Result<BTreeMap<_, _>, _>>()?;
    if !parsed.contains_key(&PluralForm::Other) {
        return Err(LocalizationError::PluralMissingOther {
            locale: locale.to_string(),
            key: key.to_string(),
        });
    }
    Ok(parsed)
}

fn fill_placeholders<'a>(template: &'a str, params: &LocalizationParams<'_>) -> Cow<'a, str> {
    if !template.contains('{') {
        return Cow::Borrowed(template);
    }
    let mut text = template.to_string();
    if let Some(count) = params.count {
        text = text.replace("{count}", &count.to_string());
    }
    for (index, value) in params.positional.iter().enumerate() {
        text = text.replace(&format!("{{{index}}}"), value);
    }
    Cow::Owned(text)
}
