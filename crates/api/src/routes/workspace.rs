//! Route definitions for the `/workspaces` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::workspace;
use crate::state::AppState;

/// Routes mounted at `/workspaces`.
///
/// ```text
/// GET    /                                          -> list_open
/// GET    /{id}                                      -> open (opens on first use)
/// PUT    /{id}                                      -> update_project
/// DELETE /{id}                                      -> close
/// POST   /{id}/reload                               -> reload
/// POST   /{id}/flush                                -> flush
/// POST   /{id}/structure                            -> edit_structure
/// POST   /{id}/generate                             -> generate
/// POST   /{id}/optimize-prompt                      -> optimize_prompt
/// POST   /{id}/translate                            -> translate_document
/// PUT    /{id}/languages                            -> set_languages
/// GET    /{id}/images                               -> list_images
/// POST   /{id}/images                               -> upload_image (multipart)
/// PUT    /{id}/components/{type}/{index}            -> save_component
/// POST   /{id}/components/{type}/{index}/regenerate -> regenerate
/// POST   /{id}/components/{type}/{index}/translate  -> translate_component
/// POST   /{id}/components/{type}/{index}/refine     -> refine
/// GET    /{id}/components/{type}/{index}/handlebar  -> export_handlebar
/// POST   /{id}/components/{type}/{index}/draft      -> begin_edit
/// PUT    /{id}/components/{type}/{index}/draft      -> update_draft
/// DELETE /{id}/components/{type}/{index}/draft      -> cancel_edit
/// POST   /{id}/components/{type}/{index}/draft/save -> save_draft
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(workspace::list_open))
        .route(
            "/{id}",
            get(workspace::open)
                .put(workspace::update_project)
                .delete(workspace::close),
        )
        .route("/{id}/reload", post(workspace::reload))
        .route("/{id}/flush", post(workspace::flush))
        .route("/{id}/structure", post(workspace::edit_structure))
        .route("/{id}/generate", post(workspace::generate))
        .route("/{id}/optimize-prompt", post(workspace::optimize_prompt))
        .route("/{id}/translate", post(workspace::translate_document))
        .route("/{id}/languages", put(workspace::set_languages))
        .route(
            "/{id}/images",
            get(workspace::list_images).post(workspace::upload_image),
        )
        .route(
            "/{id}/components/{component_type}/{index}",
            put(workspace::save_component),
        )
        .route(
            "/{id}/components/{component_type}/{index}/regenerate",
            post(workspace::regenerate),
        )
        .route(
            "/{id}/components/{component_type}/{index}/translate",
            post(workspace::translate_component),
        )
        .route(
            "/{id}/components/{component_type}/{index}/refine",
            post(workspace::refine),
        )
        .route(
            "/{id}/components/{component_type}/{index}/handlebar",
            get(workspace::export_handlebar),
        )
        .route(
            "/{id}/components/{component_type}/{index}/draft",
            post(workspace::begin_edit)
                .put(workspace::update_draft)
                .delete(workspace::cancel_edit),
        )
        .route(
            "/{id}/components/{component_type}/{index}/draft/save",
            post(workspace::save_draft),
        )
}
