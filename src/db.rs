use sqlx::{Pool, Postgres};

mod category;
pub use category::CategoryExt;

mod tag;
pub use tag::TagExt;

mod user;
pub use user::UserExt;

mod post;
pub use post::{NewPost, PostExt, PostFilters, PostPatch};

mod comment;
pub use comment::{CommentAdminExt, CommentExt, NewComment};

mod settings;
pub use settings::SettingsExt;

/// Handle to the connection pool. All database access goes through the
/// per-resource extension traits implemented on this type; code that only
/// needs a slice of the surface takes a generic bound on that trait instead
/// of the whole client.
#[derive(Debug, Clone)]
pub struct DBClient {
    pool: Pool<Postgres>,
}

impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient { pool }
    }
}
