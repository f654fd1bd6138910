//! CSV and PDF exports for managers.

use chrono::{DateTime, Local, TimeZone};
use ideaboard_common::{AppError, AppResult};
use ideaboard_db::{
    entities::{IdeaStatus, idea, user},
    repositories::{CategoryCount, CommentRepository, IdeaRepository, LikeRepository, UserRepository},
};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference};
use tracing::info;

use crate::{Principal, services::user::load_summaries};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Titles in the PDF report are cut to this many characters.
const REPORT_TITLE_WIDTH: usize = 40;

const IDEAS_HEADER: &str =
    "ID,Title,Description,Category,Status,Progress,Author,Likes,Comments,Created At";

const USERS_HEADER: &str = "ID,Username,Email,First Name,Last Name,Role,XP Points,Level,Ideas Count,Likes Given,Comments,Active,Created At";

/// Quote a CSV field if it contains a comma, quote or newline.
#[must_use]
pub fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Format an instant in server-local time.
fn format_date<Tz: TimeZone>(at: &DateTime<Tz>) -> String {
    at.with_timezone(&Local).format(DATE_FORMAT).to_string()
}

/// Shorten to `width` characters, ending in "..." when cut.
fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let head: String = value.chars().take(width.saturating_sub(3)).collect();
    format!("{head}...")
}

/// Aggregate figures shared by the statistics exports.
#[derive(Debug, Clone)]
pub struct StatisticsSnapshot {
    pub total_ideas: u64,
    pub by_status: Vec<(IdeaStatus, i64)>,
    pub total_users: u64,
    pub total_likes: u64,
    pub total_comments: u64,
    pub by_category: Vec<CategoryCount>,
    /// (title, author username, likes), most liked first.
    pub top_ideas: Vec<(String, String, i32)>,
}

/// One line of the PDF report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportLine {
    Title(String),
    Caption(String),
    Heading(String),
    Header(Vec<String>),
    Row(Vec<String>),
}

/// Statistics as `Metric,Value` rows.
#[must_use]
pub fn statistics_csv(stats: &StatisticsSnapshot) -> String {
    let mut csv = String::from("Metric,Value\n");

    csv.push_str(&format!("Total Ideas,{}\n", stats.total_ideas));
    for (status, count) in &stats.by_status {
        csv.push_str(&format!("Ideas - {},{count}\n", status.as_str()));
    }
    csv.push_str(&format!("Total Users,{}\n", stats.total_users));
    csv.push_str(&format!("Total Likes,{}\n", stats.total_likes));
    csv.push_str(&format!("Total Comments,{}\n", stats.total_comments));
    for c in &stats.by_category {
        csv.push_str(&format!(
            "{},{}\n",
            csv_escape(&format!("Category - {}", c.category)),
            c.count
        ));
    }

    csv
}

/// Lay out the statistics report.
#[must_use]
pub fn report_lines(stats: &StatisticsSnapshot, generated: &str) -> Vec<ReportLine> {
    let mut lines = vec![
        ReportLine::Title("Statistics Report".to_string()),
        ReportLine::Caption(format!("Generated: {generated}")),
        ReportLine::Heading("Overview".to_string()),
        ReportLine::Row(vec!["Total Ideas".to_string(), stats.total_ideas.to_string()]),
        ReportLine::Row(vec!["Total Users".to_string(), stats.total_users.to_string()]),
        ReportLine::Row(vec!["Total Likes".to_string(), stats.total_likes.to_string()]),
        ReportLine::Row(vec![
            "Total Comments".to_string(),
            stats.total_comments.to_string(),
        ]),
        ReportLine::Heading("Ideas by Status".to_string()),
        ReportLine::Header(vec!["Status".to_string(), "Count".to_string()]),
    ];

    for (status, count) in &stats.by_status {
        lines.push(ReportLine::Row(vec![
            status.as_str().to_string(),
            count.to_string(),
        ]));
    }

    lines.push(ReportLine::Heading("Ideas by Category".to_string()));
    lines.push(ReportLine::Header(vec![
        "Category".to_string(),
        "Count".to_string(),
    ]));
    for c in &stats.by_category {
        lines.push(ReportLine::Row(vec![c.category.clone(), c.count.to_string()]));
    }

    lines.push(ReportLine::Heading("Top 5 Ideas by Likes".to_string()));
    lines.push(ReportLine::Header(vec![
        "Title".to_string(),
        "Author".to_string(),
        "Likes".to_string(),
    ]));
    for (title, author, likes) in &stats.top_ideas {
        lines.push(ReportLine::Row(vec![
            truncate(title, REPORT_TITLE_WIDTH),
            author.clone(),
            likes.to_string(),
        ]));
    }

    lines
}

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;

struct PdfWriter {
    doc: PdfDocumentReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    page: printpdf::PdfPageIndex,
    layer: printpdf::PdfLayerIndex,
    y: f32,
}

impl PdfWriter {
    fn new(title: &str) -> AppResult<Self> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| AppError::Internal(format!("PDF font error: {e}")))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| AppError::Internal(format!("PDF font error: {e}")))?;

        Ok(Self {
            doc,
            regular,
            bold,
            page,
            layer,
            y: PAGE_HEIGHT - MARGIN,
        })
    }

    fn advance(&mut self, height: f32) {
        if self.y - height < MARGIN {
            let (page, layer) = self
                .doc
                .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            self.page = page;
            self.layer = layer;
            self.y = PAGE_HEIGHT - MARGIN;
        }
        self.y -= height;
    }

    fn text(&self, text: &str, size: f32, x: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.doc
            .get_page(self.page)
            .get_layer(self.layer)
            .use_text(text, size, Mm(x), Mm(self.y), font);
    }

    fn columns(&mut self, cells: &[String], bold: bool) {
        self.advance(7.0);
        let width = (PAGE_WIDTH - 2.0 * MARGIN) / cells.len().max(1) as f32;
        let mut x = MARGIN;
        for cell in cells {
            self.text(cell, 10.0, x, bold);
            x += width;
        }
    }

    fn write(&mut self, line: &ReportLine) {
        match line {
            ReportLine::Title(text) => {
                self.advance(10.0);
                self.text(text, 20.0, MARGIN, true);
            }
            ReportLine::Caption(text) => {
                self.advance(8.0);
                self.text(text, 10.0, MARGIN, false);
            }
            ReportLine::Heading(text) => {
                self.advance(14.0);
                self.text(text, 14.0, MARGIN, true);
            }
            ReportLine::Header(cells) => self.columns(cells, true),
            ReportLine::Row(cells) => self.columns(cells, false),
        }
    }

    fn finish(self) -> AppResult<Vec<u8>> {
        self.doc
            .save_to_bytes()
            .map_err(|e| AppError::Internal(format!("PDF render error: {e}")))
    }
}

/// Render report lines to a PDF document.
pub fn render_pdf(title: &str, lines: &[ReportLine]) -> AppResult<Vec<u8>> {
    let mut writer = PdfWriter::new(title)?;
    for line in lines {
        writer.write(line);
    }
    writer.finish()
}

/// Export service.
#[derive(Clone)]
pub struct ExportService {
    idea_repo: IdeaRepository,
    user_repo: UserRepository,
    like_repo: LikeRepository,
    comment_repo: CommentRepository,
}

impl ExportService {
    /// Create a new export service.
    #[must_use]
    pub const fn new(
        idea_repo: IdeaRepository,
        user_repo: UserRepository,
        like_repo: LikeRepository,
        comment_repo: CommentRepository,
    ) -> Self {
        Self {
            idea_repo,
            user_repo,
            like_repo,
            comment_repo,
        }
    }

    /// Every idea as CSV, newest first.
    pub async fn ideas_csv(&self, principal: &Principal) -> AppResult<String> {
        principal.require_manager()?;

        let ideas = self.idea_repo.find_all().await?;
        let authors =
            load_summaries(&self.user_repo, ideas.iter().map(|i| i.author_id.clone())).await?;

        let mut csv = format!("{IDEAS_HEADER}\n");
        for idea in &ideas {
            let author = authors
                .get(&idea.author_id)
                .map(|a| a.username.as_str())
                .unwrap_or_default();
            csv.push_str(&idea_row(idea, author));
        }

        info!(user_id = %principal.user_id, rows = ideas.len(), "Exported ideas");
        Ok(csv)
    }

    /// Every user with activity counts as CSV, newest first.
    pub async fn users_csv(&self, principal: &Principal) -> AppResult<String> {
        principal.require_manager()?;

        let users = self.user_repo.find_all().await?;
        let db = self.user_repo.db();

        let mut csv = format!("{USERS_HEADER}\n");
        for user in &users {
            let ideas = self.idea_repo.count_by_author(db, &user.id).await?;
            let likes = self.like_repo.count_by_user(&user.id).await?;
            let comments = self.comment_repo.count_by_author(db, &user.id).await?;
            csv.push_str(&user_row(user, ideas, likes, comments));
        }

        info!(user_id = %principal.user_id, rows = users.len(), "Exported users");
        Ok(csv)
    }

    async fn snapshot(&self) -> AppResult<StatisticsSnapshot> {
        let counts = self.idea_repo.count_by_status().await?;
        let by_status = IdeaStatus::ALL
            .iter()
            .map(|status| {
                let count = counts
                    .iter()
                    .find(|(s, _)| s == status)
                    .map_or(0, |(_, c)| *c);
                (*status, count)
            })
            .collect();

        let top = self.idea_repo.find_top_by_likes(5).await?;
        let authors =
            load_summaries(&self.user_repo, top.iter().map(|i| i.author_id.clone())).await?;
        let top_ideas = top
            .into_iter()
            .map(|i| {
                let author = authors
                    .get(&i.author_id)
                    .map(|a| a.username.clone())
                    .unwrap_or_default();
                (i.title, author, i.like_count)
            })
            .collect();

        Ok(StatisticsSnapshot {
            total_ideas: self.idea_repo.count_all().await?,
            by_status,
            total_users: self.user_repo.count_all().await?,
            total_likes: self.like_repo.count_all().await?,
            total_comments: self.comment_repo.count_all().await?,
            by_category: self.idea_repo.count_by_category().await?,
            top_ideas,
        })
    }

    /// Aggregate statistics as CSV.
    pub async fn statistics_csv(&self, principal: &Principal) -> AppResult<String> {
        principal.require_manager()?;
        Ok(statistics_csv(&self.snapshot().await?))
    }

    /// Aggregate statistics as a PDF report.
    pub async fn statistics_pdf(&self, principal: &Principal) -> AppResult<Vec<u8>> {
        principal.require_manager()?;

        let stats = self.snapshot().await?;
        let generated = format_date(&Local::now());
        let lines = report_lines(&stats, &generated);

        let pdf = tokio::task::spawn_blocking(move || render_pdf("Statistics Report", &lines))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))??;

        info!(user_id = %principal.user_id, bytes = pdf.len(), "Exported statistics report");
        Ok(pdf)
    }
}

fn idea_row(idea: &idea::Model, author: &str) -> String {
    format!(
        "{},{},{},{},{},{}%,{},{},{},{}\n",
        idea.id,
        csv_escape(&idea.title),
        csv_escape(&idea.description),
        csv_escape(&idea.category),
        idea.status.as_str(),
        idea.progress_percentage,
        csv_escape(author),
        idea.like_count,
        idea.comment_count,
        format_date(&idea.created_at),
    )
}

fn user_row(user: &user::Model, ideas: u64, likes: u64, comments: u64) -> String {
    format!(
        "{},{},{},{},{},{},{},{},{},{},{},{},{}\n",
        user.id,
        csv_escape(&user.username),
        csv_escape(&user.email),
        csv_escape(&user.first_name),
        csv_escape(&user.last_name),
        user.role.as_str(),
        user.xp_points,
        user.level,
        ideas,
        likes,
        comments,
        user.is_active,
        format_date(&user.created_at),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ideaboard_db::{entities::UserRole, test_utils::fixtures};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn snapshot() -> StatisticsSnapshot {
        StatisticsSnapshot {
            total_ideas: 3,
            by_status: vec![
                (IdeaStatus::Concept, 1),
                (IdeaStatus::InProgress, 2),
                (IdeaStatus::Completed, 0),
            ],
            total_users: 4,
            total_likes: 5,
            total_comments: 6,
            by_category: vec![CategoryCount {
                category: "Process".to_string(),
                count: 3,
            }],
            top_ideas: vec![(
                "A remarkably long idea title that keeps going and going".to_string(),
                "alice".to_string(),
                5,
            )],
        }
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_escape("two\nlines"), "\"two\nlines\"");
        assert_eq!(csv_escape(""), "");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 40), "short");
        let cut = truncate(&"x".repeat(50), 40);
        assert_eq!(cut.chars().count(), 40);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_statistics_csv() {
        let csv = statistics_csv(&snapshot());
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines,
            vec![
                "Metric,Value",
                "Total Ideas,3",
                "Ideas - CONCEPT,1",
                "Ideas - IN_PROGRESS,2",
                "Ideas - COMPLETED,0",
                "Total Users,4",
                "Total Likes,5",
                "Total Comments,6",
                "Category - Process,3",
            ]
        );
    }

    #[test]
    fn test_report_lines() {
        let lines = report_lines(&snapshot(), "2025-03-12 09:30");

        assert_eq!(lines[0], ReportLine::Title("Statistics Report".to_string()));
        assert_eq!(
            lines[1],
            ReportLine::Caption("Generated: 2025-03-12 09:30".to_string())
        );
        assert!(lines.contains(&ReportLine::Heading("Top 5 Ideas by Likes".to_string())));

        let Some(ReportLine::Row(top)) = lines.last() else {
            panic!("expected a row");
        };
        assert_eq!(top[0].chars().count(), REPORT_TITLE_WIDTH);
        assert_eq!(top[1], "alice");
    }

    #[test]
    fn test_render_pdf() {
        let pdf = render_pdf("Statistics Report", &report_lines(&snapshot(), "now")).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn test_idea_row() {
        let idea = idea::Model {
            title: "Bikes, lots of them".to_string(),
            progress_percentage: 40,
            ..fixtures::idea("i1", "u1", "unused")
        };

        let row = idea_row(&idea, "alice");

        assert!(row.starts_with("i1,\"Bikes, lots of them\","));
        assert!(row.contains(",40%,alice,"));
        let created = fixtures::timestamp()
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string();
        assert!(row.ends_with(&format!("{created}\n")));
    }

    #[test]
    fn test_format_date_uses_local_time() {
        let instant = fixtures::timestamp();
        let shifted = instant.with_timezone(&chrono::FixedOffset::east_opt(5 * 3600).unwrap());

        assert_eq!(format_date(&instant), format_date(&shifted));
        assert_eq!(
            format_date(&instant),
            format_date(&Local.from_utc_datetime(&instant.naive_utc()))
        );
    }

    #[tokio::test]
    async fn test_export_requires_manager() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = ExportService::new(
            IdeaRepository::new(db.clone()),
            UserRepository::new(db.clone()),
            LikeRepository::new(db.clone()),
            CommentRepository::new(db),
        );
        let employee = Principal::new("u1", "alice", UserRole::Employee);

        assert!(matches!(
            service.ideas_csv(&employee).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            service.statistics_pdf(&employee).await,
            Err(AppError::Forbidden(_))
        ));
    }
}
