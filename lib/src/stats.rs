//! Aggregate statistics for the admin dashboard.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use fnv::FnvHashMap;

use crate::comment::{Comment, CommentStatus};
use crate::db::Database;
use crate::error::Result;
use crate::post::{Post, PostId, PostLike, PostStatus, PostView};
use crate::taxonomy::{Category, PostTag, Tag};
use crate::User;

/// Number of entries in the top post rankings.
pub const TOP_POSTS: usize = 5;

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StatsPeriod {
    Week,
    #[default]
    Month,
    Year,
}

impl StatsPeriod {
    pub fn days(&self) -> i64 {
        match self {
            StatsPeriod::Week => 7,
            StatsPeriod::Month => 30,
            StatsPeriod::Year => 365,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub posts: usize,
    pub published: usize,
    pub drafts: usize,
    pub scheduled: usize,
    pub archived: usize,
    pub featured: usize,

    pub comments: usize,
    pub approved_comments: usize,
    pub pending_comments: usize,
    pub rejected_comments: usize,
    pub spam_comments: usize,

    pub views: u64,
    pub likes: u64,
    pub shares: u64,

    pub users: usize,
    pub categories: usize,
    pub tags: usize,
}

/// Change in percent between the current and the previous period.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Growth {
    pub posts: f64,
    pub views: f64,
    pub comments: f64,
    pub likes: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TopPost {
    pub id: PostId,
    pub title: String,
    pub slug: String,
    pub views: u64,
    pub likes: u64,
}

impl From<&Post> for TopPost {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id,
            title: post.title.clone(),
            slug: post.slug.clone(),
            views: post.view_count,
            likes: post.like_count,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TermCount {
    pub name: String,
    pub slug: String,
    pub posts: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlogStatistics {
    pub period: StatsPeriod,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub totals: Totals,
    pub growth: Growth,
    /// One entry per calendar day touched by the period, from the date of
    /// `from` up to today, oldest first.
    pub views_over_time: Vec<DailyCount>,
    pub top_posts_by_views: Vec<TopPost>,
    pub top_posts_by_likes: Vec<TopPost>,
    pub posts_by_category: Vec<TermCount>,
    pub posts_by_tag: Vec<TermCount>,
}

/// Percent change from `previous` to `current`, rounded to one decimal.
///
/// Growth from nothing counts as 100% when anything happened at all.
pub fn growth(current: usize, previous: usize) -> f64 {
    if previous == 0 {
        return if current > 0 { 100.0 } else { 0.0 };
    }
    let change = (current as f64 - previous as f64) / previous as f64 * 100.0;
    (change * 10.0).round() / 10.0
}

/// Counts of timestamps falling in the current and in the previous window.
fn windowed<'a>(
    stamps: impl Iterator<Item = &'a DateTime<Utc>>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    span: Duration,
) -> (usize, usize) {
    let previous_from = from - span;
    stamps.fold((0, 0), |(cur, prev), at| {
        if *at >= from && *at <= to {
            (cur + 1, prev)
        } else if *at >= previous_from && *at < from {
            (cur, prev + 1)
        } else {
            (cur, prev)
        }
    })
}

fn top_by(posts: &[Post], key: impl Fn(&Post) -> u64) -> Vec<TopPost> {
    let mut ranked = posts.iter().filter(|p| key(p) > 0).collect::<Vec<_>>();
    ranked.sort_by(|a, b| key(b).cmp(&key(a)).then_with(|| a.title.cmp(&b.title)));
    ranked.into_iter().take(TOP_POSTS).map(TopPost::from).collect()
}

fn sorted_counts(mut counts: Vec<TermCount>) -> Vec<TermCount> {
    counts.sort_by(|a, b| b.posts.cmp(&a.posts).then_with(|| a.name.cmp(&b.name)));
    counts
}

/// Assembles the dashboard report for the period ending at `now`.
pub fn blog_statistics(db: &Database, period: StatsPeriod, now: DateTime<Utc>) -> Result<BlogStatistics> {
    let span = Duration::days(period.days());
    let from = now - span;

    let posts = db.get_collection::<Post>()?;
    let comments = db.get_collection::<Comment>()?;
    let views = db.get_collection::<PostView>()?;
    let likes = db.get_collection::<PostLike>()?;
    let categories = db.get_collection::<Category>()?;
    let tags = db.get_collection::<Tag>()?;
    let links = db.get_collection::<PostTag>()?;

    let posts_with = |status: PostStatus| posts.iter().filter(|p| p.status == status).count();
    let comments_with = |status: CommentStatus| comments.iter().filter(|c| c.status == status).count();

    let totals = Totals {
        posts: posts.len(),
        published: posts_with(PostStatus::Published),
        drafts: posts_with(PostStatus::Draft),
        scheduled: posts_with(PostStatus::Scheduled),
        archived: posts_with(PostStatus::Archived),
        featured: posts.iter().filter(|p| p.featured).count(),
        comments: comments.len(),
        approved_comments: comments_with(CommentStatus::Approved),
        pending_comments: comments_with(CommentStatus::Pending),
        rejected_comments: comments_with(CommentStatus::Rejected),
        spam_comments: comments_with(CommentStatus::Spam),
        views: posts.iter().map(|p| p.view_count).sum(),
        likes: posts.iter().map(|p| p.like_count).sum(),
        shares: posts.iter().map(|p| p.share_count).sum(),
        users: db.len::<User>()?,
        categories: categories.len(),
        tags: tags.len(),
    };

    let grow = |(current, previous): (usize, usize)| growth(current, previous);
    let change = Growth {
        posts: grow(windowed(posts.iter().map(|p| &p.created_at), from, now, span)),
        views: grow(windowed(views.iter().map(|v| &v.created_at), from, now, span)),
        comments: grow(windowed(comments.iter().map(|c| &c.created_at), from, now, span)),
        likes: grow(windowed(likes.iter().map(|l| &l.created_at), from, now, span)),
    };

    // same window as the growth figures, so the series adds up to them
    let mut per_day: FnvHashMap<NaiveDate, usize> = FnvHashMap::default();
    for view in views.iter().filter(|v| v.created_at >= from && v.created_at <= now) {
        *per_day.entry(view.created_at.date_naive()).or_insert(0) += 1;
    }
    let views_over_time = from
        .date_naive()
        .iter_days()
        .take_while(|date| *date <= now.date_naive())
        .map(|date| DailyCount {
            date,
            count: per_day.get(&date).copied().unwrap_or(0),
        })
        .collect();

    let posts_by_category = sorted_counts(
        categories
            .iter()
            .map(|c| TermCount {
                name: c.name.clone(),
                slug: c.slug.clone(),
                posts: posts.iter().filter(|p| p.category == Some(c.id)).count(),
            })
            .collect(),
    );
    let posts_by_tag = sorted_counts(
        tags.iter()
            .map(|t| TermCount {
                name: t.name.clone(),
                slug: t.slug.clone(),
                posts: links.iter().filter(|l| l.tag == t.id).count(),
            })
            .collect(),
    );

    Ok(BlogStatistics {
        period,
        from,
        to: now,
        totals,
        growth: change,
        views_over_time,
        top_posts_by_views: top_by(&posts, |p| p.view_count),
        top_posts_by_likes: top_by(&posts, |p| p.like_count),
        posts_by_category,
        posts_by_tag,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    #[test]
    fn growth_from_zero() {
        assert_eq!(growth(0, 0), 0.0);
        assert_eq!(growth(3, 0), 100.0);
        assert_eq!(growth(3, 2), 50.0);
        assert_eq!(growth(1, 3), -66.7);
    }

    #[test]
    fn counts_current_and_previous_windows() -> Result<()> {
        let db = Database::temporary()?;
        let now = Utc::now();
        let post = Post {
            title: "Old".to_string(),
            slug: "old".to_string(),
            view_count: 3,
            created_at: now - Duration::days(10),
            ..Default::default()
        };
        db.set(&post)?;
        let fresh = Post {
            title: "Fresh".to_string(),
            slug: "fresh".to_string(),
            created_at: now - Duration::days(1),
            ..Default::default()
        };
        db.set(&fresh)?;
        for (i, age) in [
            Duration::zero(),
            Duration::days(2),
            Duration::days(9),
        ]
        .iter()
        .enumerate()
        {
            db.set(&PostView {
                id: Uuid::new_v4(),
                post: post.id,
                ip: format!("10.0.0.{}", i),
                user_agent: "test".to_string(),
                user: None,
                created_at: now - *age,
            })?;
        }

        let stats = blog_statistics(&db, StatsPeriod::Week, now)?;
        assert_eq!(stats.totals.posts, 2);
        assert_eq!(stats.totals.drafts, 2);
        assert_eq!(stats.totals.views, 3);
        // one post this week, one the week before
        assert_eq!(stats.growth.posts, 0.0);
        // two views this week, one the week before
        assert_eq!(stats.growth.views, 100.0);
        assert_eq!(stats.views_over_time.iter().map(|d| d.count).sum::<usize>(), 2);
        assert_eq!(stats.views_over_time.last().map(|d| d.date), Some(now.date_naive()));
        assert_eq!(stats.top_posts_by_views.len(), 1);
        assert_eq!(stats.top_posts_by_views[0].slug, "old");
        assert!(stats.top_posts_by_likes.is_empty());
        Ok(())
    }

    #[test]
    fn daily_series_covers_partial_first_day() -> Result<()> {
        let db = Database::temporary()?;
        let now = Utc::now();
        let from = now - Duration::days(StatsPeriod::Week.days());
        let post = Post {
            slug: "edge".to_string(),
            view_count: 2,
            ..Default::default()
        };
        db.set(&post)?;
        // right after the window opens and right before it
        for (i, at) in [from + Duration::minutes(1), from - Duration::minutes(1)]
            .iter()
            .enumerate()
        {
            db.set(&PostView {
                id: Uuid::new_v4(),
                post: post.id,
                ip: format!("10.0.1.{}", i),
                user_agent: "test".to_string(),
                user: None,
                created_at: *at,
            })?;
        }

        let stats = blog_statistics(&db, StatsPeriod::Week, now)?;
        let series = &stats.views_over_time;
        assert_eq!(series.len(), 8);
        assert_eq!(series[0].date, from.date_naive());
        assert_eq!(series.last().map(|d| d.date), Some(now.date_naive()));
        assert_eq!(series.iter().map(|d| d.count).sum::<usize>(), 1);
        // previous window has one view as well
        assert_eq!(stats.growth.views, 0.0);
        Ok(())
    }
}
