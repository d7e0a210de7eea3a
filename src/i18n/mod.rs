//! Internationalization (i18n) module.
//!
//! Localized status lines, prompts and CLI help. English is the default;
//! Spanish is available as an alternative.

use std::sync::OnceLock;

static CURRENT_LANG: OnceLock<Lang> = OnceLock::new();

/// Supported languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    /// English (default)
    En,
    /// Spanish
    Es,
}

impl Lang {
    /// Parse a language code string (e.g. "en", "es", "en_US", "es_ES").
    /// Returns `None` for unrecognized codes.
    pub fn from_code(code: &str) -> Option<Self> {
        let normalized = code.to_lowercase();
        let prefix = normalized.split(['_', '-', '.']).next().unwrap_or("");
        match prefix {
            "en" => Some(Self::En),
            "es" => Some(Self::Es),
            _ => None,
        }
    }

    /// Return the ISO 639-1 code for this language.
    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
        }
    }
}

/// Initialize the global language. Call once at startup.
/// If already initialized, this is a no-op.
pub fn set_lang(lang: Lang) {
    let _ = CURRENT_LANG.set(lang);
}

/// Get the currently configured language (defaults to English).
pub fn lang() -> Lang {
    CURRENT_LANG.get().copied().unwrap_or(Lang::En)
}

/// Detect language from `EMAILCLIPPER_LANG`, `LC_MESSAGES` or `LANG`.
pub fn detect_system_lang() -> Lang {
    ["EMAILCLIPPER_LANG", "LC_MESSAGES", "LANG"]
        .iter()
        .find_map(|var| std::env::var(var).ok().and_then(|v| Lang::from_code(&v)))
        .unwrap_or(Lang::En)
}

/// Defines a function returning the `&'static str` for the current language.
macro_rules! msg {
    ($name:ident, $en:expr, $es:expr) => {
        /// Returns a localized string for the current language.
        pub fn $name() -> &'static str {
            match lang() {
                Lang::En => $en,
                Lang::Es => $es,
            }
        }
    };
}

// ── General ──────────────────────────────────────────────────────

msg!(
    app_about,
    "Send an email and its attachments to the Joplin inbox through the local Web Clipper service.",
    "Env\u{ed}a un correo y sus adjuntos a la bandeja de Joplin a trav\u{e9}s del servicio Web Clipper local."
);
msg!(
    app_long_about,
    "emailclipper \u{2014} send an email to Joplin.\nFinds the Web Clipper service on ports 41184-41194, lets you pick a\nnotebook, tags and attachments, and creates the note.",
    "emailclipper \u{2014} env\u{ed}a un correo a Joplin.\nBusca el servicio Web Clipper en los puertos 41184-41194, permite elegir\nlibreta, etiquetas y adjuntos, y crea la nota."
);

// ── CLI help strings ─────────────────────────────────────────────

msg!(
    help_cmd_clip,
    "Send an .eml message to Joplin",
    "Enviar un mensaje .eml a Joplin"
);
msg!(
    help_cmd_preview,
    "Print the note that would be created, without contacting Joplin",
    "Mostrar la nota que se crear\u{ed}a, sin contactar con Joplin"
);
msg!(
    help_cmd_ping,
    "Look for the clipper service once and print its port",
    "Buscar el servicio una vez y mostrar su puerto"
);
msg!(
    help_cmd_notebooks,
    "List notebooks",
    "Listar libretas"
);
msg!(help_cmd_tags, "List tags", "Listar etiquetas");
msg!(
    help_cmd_config,
    "Show the config file path, or write defaults with --init",
    "Mostrar la ruta de configuraci\u{f3}n, o escribir valores por defecto con --init"
);
msg!(
    help_cmd_completions,
    "Generate shell completions",
    "Generar completions para tu shell"
);
msg!(
    help_cmd_manpage,
    "Generate a man page",
    "Generar p\u{e1}gina de manual"
);

// ── Status lines ─────────────────────────────────────────────────

msg!(
    status_looking_for_service,
    "Looking for service",
    "Buscando el servicio"
);
msg!(status_downloading, "Downloading...", "Descargando...");
msg!(
    status_loading_lists,
    "Loading notebooks and tags...",
    "Cargando libretas y etiquetas..."
);
msg!(status_sending, "Sending to Joplin...", "Enviando a Joplin...");

/// "Ready on port N".
pub fn status_ready_on_port(port: u16) -> String {
    match lang() {
        Lang::En => format!("Ready on port {port}"),
        Lang::Es => format!("Listo en el puerto {port}"),
    }
}

// ── Prompts ──────────────────────────────────────────────────────

msg!(prompt_notebook, "Notebook", "Libreta");
msg!(
    prompt_tags,
    "Tags (comma-separated, empty for none)",
    "Etiquetas (separadas por comas, vac\u{ed}o para ninguna)"
);
msg!(
    prompt_attachments,
    "Attachments (numbers, 'all' or empty for none)",
    "Adjuntos (n\u{fa}meros, 'all' o vac\u{ed}o para ninguno)"
);
msg!(
    prompt_confirm,
    "Send to Joplin? [y/N]",
    "\u{bf}Enviar a Joplin? [s/N]"
);
msg!(
    prompt_invalid_choice,
    "Invalid choice, try again",
    "Opci\u{f3}n no v\u{e1}lida, int\u{e9}ntalo de nuevo"
);

// ── Results ──────────────────────────────────────────────────────

msg!(msg_note_created, "Note created", "Nota creada");
msg!(msg_cancelled, "Cancelled", "Cancelado");
msg!(
    msg_service_not_found,
    "Clipper service not found",
    "Servicio no encontrado"
);
msg!(msg_attachments, "Attachments", "Adjuntos");
msg!(msg_tags, "Tags", "Etiquetas");
msg!(msg_no_tags, "No tags", "Sin etiquetas");
msg!(msg_default, "default", "por defecto");

// ── Errors ───────────────────────────────────────────────────────

msg!(
    err_file_not_found,
    "File not found",
    "Fichero no encontrado"
);
msg!(
    err_unknown_notebook,
    "Unknown notebook",
    "Libreta desconocida"
);
msg!(
    err_unknown_attachment,
    "Unknown attachment",
    "Adjunto desconocido"
);

/// Whether `answer` is an affirmative reply in the current language.
pub fn is_yes(answer: &str) -> bool {
    let a = answer.trim().to_lowercase();
    match lang() {
        Lang::En => matches!(a.as_str(), "y" | "yes"),
        Lang::Es => matches!(a.as_str(), "s" | "si" | "s\u{ed}" | "y" | "yes"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lang_from_code() {
        assert_eq!(Lang::from_code("en"), Some(Lang::En));
        assert_eq!(Lang::from_code("es_ES.UTF-8"), Some(Lang::Es));
        assert_eq!(Lang::from_code("es-MX"), Some(Lang::Es));
        assert_eq!(Lang::from_code("C.UTF-8"), None);
        assert_eq!(Lang::from_code("fr"), None);
    }

    #[test]
    fn test_lang_code_roundtrip() {
        assert_eq!(Lang::from_code(Lang::Es.code()), Some(Lang::Es));
        assert_eq!(Lang::from_code(Lang::En.code()), Some(Lang::En));
    }

    #[test]
    fn test_status_lines() {
        // The OnceLock may be set by another test; both languages mention the port.
        assert!(status_ready_on_port(41187).contains("41187"));
        assert!(!status_looking_for_service().is_empty());
    }

    #[test]
    fn test_yes_answers() {
        assert!(is_yes(" Y "));
        assert!(is_yes("yes"));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
    }
}
