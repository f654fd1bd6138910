//! API middleware.

#![allow(missing_docs)]

use std::{sync::Arc, time::Duration};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, Method, Request, header},
    middleware::Next,
    response::Response,
};
use ideaboard_common::{Config, JwtManager, StorageBackend};
use ideaboard_core::{
    AuditService, AuthService, ChecklistService, CommentService, DashboardService,
    ExportService, FileService, GamificationService, GroupService, IdeaService, LikeService,
    NotificationService, SurveyService, UserService,
};
use ideaboard_db::repositories::{
    AuditLogRepository, BadgeRepository, ChecklistRepository, CommentRepository,
    FileAttachmentRepository, GroupRepository, IdeaRepository, LikeRepository,
    NotificationRepository, SurveyRepository, UserRepository,
};
use sea_orm::DatabaseConnection;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub idea_service: IdeaService,
    pub like_service: LikeService,
    pub checklist_service: ChecklistService,
    pub comment_service: CommentService,
    pub file_service: FileService,
    pub group_service: GroupService,
    pub survey_service: SurveyService,
    pub notification_service: NotificationService,
    pub gamification_service: GamificationService,
    pub dashboard_service: DashboardService,
    pub export_service: ExportService,
    pub audit_service: AuditService,
}

impl AppState {
    /// Wire repositories and services over one connection pool.
    #[must_use]
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: &Config,
        storage: Arc<dyn StorageBackend>,
    ) -> Self {
        let user_repo = UserRepository::new(Arc::clone(&db));
        let idea_repo = IdeaRepository::new(Arc::clone(&db));
        let like_repo = LikeRepository::new(Arc::clone(&db));
        let checklist_repo = ChecklistRepository::new(Arc::clone(&db));
        let comment_repo = CommentRepository::new(Arc::clone(&db));
        let file_repo = FileAttachmentRepository::new(Arc::clone(&db));
        let group_repo = GroupRepository::new(Arc::clone(&db));
        let survey_repo = SurveyRepository::new(Arc::clone(&db));
        let notification_repo = NotificationRepository::new(Arc::clone(&db));
        let badge_repo = BadgeRepository::new(Arc::clone(&db));
        let audit_repo = AuditLogRepository::new(Arc::clone(&db));

        let audit_service = AuditService::new(audit_repo);
        let notification_service =
            NotificationService::new(Arc::clone(&db), notification_repo);
        let gamification_service = GamificationService::new(
            user_repo.clone(),
            badge_repo,
            idea_repo.clone(),
            like_repo.clone(),
            comment_repo.clone(),
            notification_service.clone(),
        );
        let group_service = GroupService::new(
            Arc::clone(&db),
            group_repo,
            idea_repo.clone(),
            user_repo.clone(),
            notification_service.clone(),
        );
        let idea_service = IdeaService::new(
            Arc::clone(&db),
            idea_repo.clone(),
            user_repo.clone(),
            like_repo.clone(),
            checklist_repo.clone(),
            file_repo.clone(),
            group_service.clone(),
            gamification_service.clone(),
            notification_service.clone(),
            audit_service.clone(),
        );
        let survey_service = SurveyService::new(
            Arc::clone(&db),
            survey_repo.clone(),
            user_repo.clone(),
            audit_service.clone(),
        );

        Self {
            auth_service: AuthService::new(
                Arc::clone(&db),
                user_repo.clone(),
                JwtManager::new(&config.auth),
                audit_service.clone(),
            ),
            user_service: UserService::new(
                Arc::clone(&db),
                user_repo.clone(),
                audit_service.clone(),
            ),
            like_service: LikeService::new(
                Arc::clone(&db),
                like_repo.clone(),
                idea_repo.clone(),
                gamification_service.clone(),
                notification_service.clone(),
            ),
            checklist_service: ChecklistService::new(
                Arc::clone(&db),
                checklist_repo,
                idea_repo.clone(),
            ),
            comment_service: CommentService::new(
                Arc::clone(&db),
                comment_repo.clone(),
                idea_repo.clone(),
                user_repo.clone(),
                gamification_service.clone(),
                notification_service.clone(),
            ),
            file_service: FileService::new(
                Arc::clone(&db),
                file_repo,
                idea_repo.clone(),
                audit_service.clone(),
                storage,
                config.storage.max_file_size,
            ),
            dashboard_service: DashboardService::new(
                idea_repo.clone(),
                user_repo.clone(),
                like_repo.clone(),
                comment_repo.clone(),
                survey_repo,
                idea_service.clone(),
                survey_service.clone(),
            ),
            export_service: ExportService::new(idea_repo, user_repo, like_repo, comment_repo),
            idea_service,
            group_service,
            survey_service,
            notification_service,
            gamification_service,
            audit_service,
        }
    }
}

/// Authentication middleware.
///
/// A valid bearer token attaches the caller's principal to the request.
/// Invalid or missing tokens are left for the extractor to reject.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get(header::AUTHORIZATION)
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        match state.auth_service.authenticate(token.trim()) {
            Ok(principal) => {
                req.extensions_mut().insert(principal);
            }
            Err(e) => tracing::debug!(error = %e, "Rejected bearer token"),
        }
    }

    next.run(req).await
}

/// CORS policy: any origin mirrored back, with credentials.
#[must_use]
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::HEAD,
            Method::PATCH,
        ])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
        .max_age(Duration::from_secs(86_400))
}
