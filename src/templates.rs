//! Built-in bucket templates.
//!
//! A template is a named list of buckets with their extension claims. Every
//! template ends with an `Others` catch-all.

/// One bucket a template creates.
#[derive(Debug, Clone, Copy)]
pub struct TemplateBucket {
    pub name: &'static str,
    pub priority: i32,
    pub extensions: &'static [&'static str],
    pub catch_all: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Template {
    pub name: &'static str,
    pub description: &'static str,
    pub buckets: &'static [TemplateBucket],
}

const fn bucket(
    name: &'static str,
    priority: i32,
    extensions: &'static [&'static str],
) -> TemplateBucket {
    TemplateBucket {
        name,
        priority,
        extensions,
        catch_all: false,
    }
}

const OTHERS: TemplateBucket = TemplateBucket {
    name: "Others",
    priority: i32::MAX,
    extensions: &[],
    catch_all: true,
};

const TEMPLATES: &[Template] = &[
    Template {
        name: "standard",
        description: "Documents, images, videos, music and archives",
        buckets: &[
            bucket(
                "Documents",
                1,
                &[".pdf", ".doc", ".docx", ".txt", ".xlsx", ".xls", ".ppt", ".pptx", ".odt"],
            ),
            bucket(
                "Images",
                2,
                &[".jpg", ".jpeg", ".png", ".gif", ".bmp", ".svg", ".webp", ".ico"],
            ),
            bucket("Videos", 3, &[".mp4", ".avi", ".mkv", ".mov", ".wmv", ".flv"]),
            bucket("Music", 4, &[".mp3", ".wav", ".flac", ".aac", ".ogg", ".m4a"]),
            bucket("Archives", 5, &[".zip", ".rar", ".7z", ".tar", ".gz"]),
            OTHERS,
        ],
    },
    Template {
        name: "developer",
        description: "Source code, executables, configuration, data and logs",
        buckets: &[
            bucket(
                "Source Code",
                1,
                &[".cs", ".py", ".js", ".ts", ".html", ".css", ".java", ".cpp", ".h", ".go", ".rs"],
            ),
            bucket("Executables", 2, &[".exe", ".msi", ".dll", ".bat", ".ps1", ".sh"]),
            bucket("Configuration", 3, &[".json", ".xml", ".yaml", ".yml", ".ini", ".config"]),
            bucket("Data", 4, &[".sql", ".db", ".sqlite", ".csv"]),
            bucket("Logs", 5, &[".log", ".txt"]),
            OTHERS,
        ],
    },
    Template {
        name: "designer",
        description: "Vectors, raster images, design projects and fonts",
        buckets: &[
            bucket("Vectors", 1, &[".svg", ".ai", ".eps"]),
            bucket("Raster", 2, &[".png", ".jpg", ".jpeg", ".gif", ".webp", ".tiff"]),
            bucket("Projects", 3, &[".psd", ".indd", ".fig", ".sketch"]),
            bucket("Fonts", 4, &[".ttf", ".otf", ".woff", ".woff2"]),
            OTHERS,
        ],
    },
];

pub fn builtin() -> &'static [Template] {
    TEMPLATES
}

/// Look up a template by name, ignoring case.
pub fn find(name: &str) -> Option<&'static Template> {
    TEMPLATES
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(name.trim()))
}
