use std::sync::LazyLock;
use tera::Tera;

/// Templates compiled into the binary, so the demo runs from any directory
pub static WEB_TEMPLATES: LazyLock<Tera> = LazyLock::new(|| {
    let mut tera = Tera::default();
    if let Err(e) = tera.add_raw_templates(vec![(
        "index.html",
        include_str!("../../web/templates/index.html"),
    )]) {
        log::error!("web templates could not be parsed: {e}");
    }
    tera
});
