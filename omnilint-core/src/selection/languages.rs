//! Language detection from file extensions and workspace markers.

use std::collections::BTreeSet;
use std::path::Path;

use once_cell::sync::Lazy;

static EXTENSION_LANGUAGES: Lazy<Vec<(&str, &str)>> = Lazy::new(|| {
    vec![
        ("py", "python"),
        ("pyi", "python"),
        ("rs", "rust"),
        ("go", "go"),
        ("js", "javascript"),
        ("jsx", "javascript"),
        ("mjs", "javascript"),
        ("cjs", "javascript"),
        ("ts", "typescript"),
        ("tsx", "typescript"),
        ("lua", "lua"),
        ("pl", "perl"),
        ("pm", "perl"),
        ("t", "perl"),
        ("sh", "shell"),
        ("bash", "shell"),
        ("zsh", "shell"),
        ("md", "markdown"),
        ("markdown", "markdown"),
        ("yml", "yaml"),
        ("yaml", "yaml"),
        ("json", "json"),
        ("toml", "toml"),
        ("sql", "sql"),
        ("css", "css"),
        ("scss", "css"),
        ("html", "html"),
        ("htm", "html"),
        ("c", "c"),
        ("h", "c"),
        ("cc", "cpp"),
        ("cpp", "cpp"),
        ("hpp", "cpp"),
        ("java", "java"),
        ("rb", "ruby"),
        ("php", "php"),
        ("tf", "terraform"),
    ]
});

static WORKSPACE_MARKERS: Lazy<Vec<(&str, &str)>> = Lazy::new(|| {
    vec![
        ("pyproject.toml", "python"),
        ("setup.py", "python"),
        ("package.json", "javascript"),
        ("tsconfig.json", "typescript"),
        ("Cargo.toml", "rust"),
        ("go.mod", "go"),
        ("Gemfile", "ruby"),
        ("composer.json", "php"),
    ]
});

/// Languages inferred from the discovered files plus workspace marker
/// files at the root. Sorted and deduplicated.
pub fn detect_languages(root: &Path, files: &[std::path::PathBuf]) -> Vec<String> {
    let mut languages = BTreeSet::new();
    for file in files {
        if file.file_name().is_some_and(|name| name == "Dockerfile") {
            let _ = languages.insert("dockerfile".to_string());
            continue;
        }
        let Some(extension) = file.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        let lowered = extension.to_ascii_lowercase();
        for (candidate, language) in EXTENSION_LANGUAGES.iter() {
            if *candidate == lowered {
                let _ = languages.insert((*language).to_string());
            }
        }
    }
    for (marker, language) in WORKSPACE_MARKERS.iter() {
        if root.join(marker).exists() {
            let _ = languages.insert((*language).to_string());
        }
    }
    languages.into_iter().collect()
}
