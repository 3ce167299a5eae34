//! Template engine setup and HTML templates.

use once_cell::sync::Lazy;
use tera::{Context, Tera};

/// Global template engine instance with embedded templates.
pub static TEMPLATES: Lazy<Tera> = Lazy::new(|| {
    let mut tera = Tera::default();

    // Embed templates directly in the binary (no external files needed)
    tera.add_raw_templates(vec![
        ("base.html", BASE_TEMPLATE),
        ("macros.html", MACROS_TEMPLATE),
        ("index.html", INDEX_TEMPLATE),
        ("casinos.html", CASINOS_TEMPLATE),
        ("casino.html", CASINO_TEMPLATE),
        ("games.html", GAMES_TEMPLATE),
        ("game.html", GAME_TEMPLATE),
        ("blogs.html", BLOGS_TEMPLATE),
        ("blog.html", BLOG_TEMPLATE),
        ("author.html", AUTHOR_TEMPLATE),
        ("dashboard.html", DASHBOARD_TEMPLATE),
        ("login.html", LOGIN_TEMPLATE),
        ("register.html", REGISTER_TEMPLATE),
        ("error.html", ERROR_TEMPLATE),
    ])
    .expect("Failed to load templates");

    tera
});

/// Sitemap templates, autoescaped for XML rather than HTML
pub static XML_TEMPLATES: Lazy<Tera> = Lazy::new(|| {
    let mut tera = Tera::default();
    tera.autoescape_on(vec![".xml"]);
    tera.set_escape_fn(escape_xml);

    tera.add_raw_templates(vec![
        ("sitemap_index.xml", SITEMAP_INDEX_TEMPLATE),
        ("urlset.xml", URLSET_TEMPLATE),
    ])
    .expect("Failed to load XML templates");

    tera
});

/// The five predefined XML entities; `/` and `=` stay as they are in URLs
fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Render a template with context
pub fn render(template: &str, context: &Context) -> Result<String, tera::Error> {
    TEMPLATES.render(template, context)
}

/// Render a sitemap template with context
pub fn render_xml(template: &str, context: &Context) -> Result<String, tera::Error> {
    XML_TEMPLATES.render(template, context)
}

// =============================================================================
// Embedded Templates
// =============================================================================

const BASE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{% block title %}{% if seo_title %}{{ seo_title }} | {% endif %}{{ site_name }}{% endblock %}</title>
    {% if seo_description %}<meta name="description" content="{{ seo_description }}">{% endif %}
    {% if canonical_url %}<link rel="canonical" href="{{ canonical_url }}">{% endif %}
    <style>
        :root {
            --bg: #0b0d12;
            --bg-secondary: #151922;
            --foreground: #f4f4f5;
            --foreground-secondary: rgba(244, 244, 245, 0.72);
            --foreground-tertiary: rgba(244, 244, 245, 0.42);
            --border: #252b37;
            --border-subtle: #1b202a;
            --accent: #f5b53d;
            --danger: #f87171;
        }

        * { box-sizing: border-box; margin: 0; padding: 0; }

        body {
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Helvetica, Arial, sans-serif;
            background: var(--bg);
            color: var(--foreground);
            line-height: 1.6;
            -webkit-font-smoothing: antialiased;
        }

        a { color: var(--foreground); text-decoration: none; transition: opacity 0.15s; }
        a:hover { opacity: 0.75; }

        .header { border-bottom: 1px solid var(--border-subtle); padding: 20px 32px; }
        .header-content {
            max-width: 1200px;
            margin: 0 auto;
            display: flex;
            align-items: center;
            justify-content: space-between;
        }
        .logo { font-size: 18px; font-weight: 700; color: var(--accent); }
        .nav { display: flex; gap: 28px; }
        .nav a { color: var(--foreground-secondary); font-size: 14px; }

        .container { max-width: 1200px; margin: 0 auto; padding: 48px 32px; }

        h1 { font-size: 32px; font-weight: 600; letter-spacing: -0.02em; margin-bottom: 24px; }
        h2 {
            font-size: 14px;
            font-weight: 500;
            color: var(--foreground-secondary);
            text-transform: uppercase;
            letter-spacing: 0.05em;
            margin: 40px 0 16px;
        }

        .grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(240px, 1fr)); gap: 20px; }
        .card {
            background: var(--bg-secondary);
            border: 1px solid var(--border);
            border-radius: 14px;
            overflow: hidden;
        }
        .card-body { padding: 20px; }
        .card img { width: 100%; height: 160px; object-fit: cover; display: block; }
        .card-title { font-weight: 600; margin-bottom: 6px; }

        .rating { color: var(--accent); font-weight: 600; }
        .badge {
            font-size: 11px;
            padding: 3px 10px;
            border-radius: 100px;
            background: var(--border);
            color: var(--foreground-secondary);
        }

        .btn {
            display: inline-flex;
            align-items: center;
            padding: 10px 20px;
            border-radius: 100px;
            font-size: 14px;
            font-weight: 500;
            border: none;
            cursor: pointer;
        }
        .btn-primary { background: var(--accent); color: var(--bg); }
        .btn-secondary { background: transparent; border: 1px solid var(--border); color: var(--foreground); }

        .prose { color: var(--foreground-secondary); max-width: 760px; }
        .prose p + p { margin-top: 12px; }

        .form { max-width: 380px; display: flex; flex-direction: column; gap: 14px; }
        .form input {
            background: var(--bg-secondary);
            border: 1px solid var(--border);
            border-radius: 8px;
            color: var(--foreground);
            padding: 10px 12px;
        }
        .alert { padding: 12px 16px; border-radius: 8px; margin-bottom: 20px; font-size: 14px; }
        .alert-error { background: rgba(248, 113, 113, 0.12); color: var(--danger); }

        .pager { display: flex; gap: 12px; margin-top: 32px; align-items: center; }
        .empty { text-align: center; padding: 64px 32px; color: var(--foreground-tertiary); }
        .text-secondary { color: var(--foreground-secondary); }
        .text-sm { font-size: 13px; }
        .mt-4 { margin-top: 16px; }

        @media (max-width: 768px) {
            .header { padding: 16px 20px; }
            .container { padding: 32px 20px; }
            h1 { font-size: 24px; }
            .nav { gap: 16px; }
        }
    </style>
</head>
<body>
    <header class="header">
        <div class="header-content">
            <a href="/" class="logo">{{ site_name }}</a>
            <nav class="nav">
                <a href="/casinos">Casinos</a>
                <a href="/games">Games</a>
                <a href="/blog">Blog</a>
                {% if logged_in %}
                <a href="/dashboard">Dashboard</a>
                <a href="/authentication/logout">Log out</a>
                {% else %}
                <a href="/authentication/login">Log in</a>
                {% endif %}
            </nav>
        </div>
    </header>
    <main class="container">
        {% block content %}{% endblock %}
    </main>
</body>
</html>"##;

const MACROS_TEMPLATE: &str = r##"{% macro image(img, media_url) %}{% if img.url is starting_with("http") or img.url is starting_with("//") %}{{ img.url }}{% else %}{{ media_url }}{{ img.url }}{% endif %}{% endmacro image %}

{% macro stars(avg, count) %}<span class="rating">&#9733; {{ avg | round(precision=2) }}</span> <span class="text-sm text-secondary">({{ count }})</span>{% endmacro stars %}

{% macro casino_card(casino, media_url) %}
<a class="card" href="/casinos/{{ casino.slug }}">
    {% if casino.logo %}<img src="{{ self::image(img=casino.logo, media_url=media_url) }}" alt="{{ casino.title }}">{% endif %}
    <div class="card-body">
        <div class="card-title">{{ casino.title }}</div>
        {{ self::stars(avg=casino.ratingAvg, count=casino.ratingCount) }}
        {% if casino.bonusText %}<p class="text-sm text-secondary">{{ casino.bonusText }}</p>{% endif %}
    </div>
</a>
{% endmacro casino_card %}

{% macro game_card(game, media_url) %}
<a class="card" href="/games/{{ game.slug }}">
    {% if game.images %}<img src="{{ self::image(img=game.images, media_url=media_url) }}" alt="{{ game.title }}">{% endif %}
    <div class="card-body">
        <div class="card-title">{{ game.title }}</div>
        {% if game.provider %}<span class="badge">{{ game.provider.title }}</span>{% endif %}
        {{ self::stars(avg=game.ratingAvg, count=game.ratingCount) }}
    </div>
</a>
{% endmacro game_card %}

{% macro blog_card(blog, media_url) %}
<a class="card" href="/blog/{{ blog.slug }}">
    {% if blog.image %}<img src="{{ self::image(img=blog.image, media_url=media_url) }}" alt="{{ blog.title }}">{% endif %}
    <div class="card-body">
        <div class="card-title">{{ blog.title }}</div>
        {% if blog.excerpt %}<p class="text-sm text-secondary">{{ blog.excerpt }}</p>{% endif %}
    </div>
</a>
{% endmacro blog_card %}

{% macro pager(base, page, page_count, query) %}
{% if page_count > 1 %}
<div class="pager">
    {% if page > 1 %}<a class="btn btn-secondary" href="{{ base }}?page={{ page - 1 }}{{ query }}">Previous</a>{% endif %}
    <span class="text-sm text-secondary">Page {{ page }} of {{ page_count }}</span>
    {% if page < page_count %}<a class="btn btn-secondary" href="{{ base }}?page={{ page + 1 }}{{ query }}">Next</a>{% endif %}
</div>
{% endif %}
{% endmacro pager %}"##;

const INDEX_TEMPLATE: &str = r##"{% extends "base.html" %}
{% import "macros.html" as m %}
{% block content %}
<h1>{% if home.page.heading %}{{ home.page.heading }}{% else %}{{ home.page.title }}{% endif %}</h1>
{% if home.page.introduction %}<div class="prose">{{ home.page.introduction | safe }}</div>{% endif %}

<h2>Top casinos</h2>
{% if home.top_casinos %}
<div class="grid">
    {% for casino in home.top_casinos %}{{ m::casino_card(casino=casino, media_url=media_url) }}{% endfor %}
</div>
{% else %}
<div class="empty"><p>No casinos reviewed yet.</p></div>
{% endif %}

<h2>Latest games</h2>
{% if home.latest_games %}
<div class="grid">
    {% for game in home.latest_games %}{{ m::game_card(game=game, media_url=media_url) }}{% endfor %}
</div>
{% else %}
<div class="empty"><p>No games yet.</p></div>
{% endif %}

{% if home.latest_blogs %}
<h2>From the blog</h2>
<div class="grid">
    {% for blog in home.latest_blogs %}{{ m::blog_card(blog=blog, media_url=media_url) }}{% endfor %}
</div>
{% endif %}
{% endblock %}"##;

const CASINOS_TEMPLATE: &str = r##"{% extends "base.html" %}
{% import "macros.html" as m %}
{% block content %}
<h1>Casino reviews</h1>
{% if listing.items %}
<div class="grid">
    {% for casino in listing.items %}{{ m::casino_card(casino=casino, media_url=media_url) }}{% endfor %}
</div>
{{ m::pager(base="/casinos", page=listing.page, page_count=listing.pageCount, query="") }}
{% else %}
<div class="empty"><p>No casinos found.</p></div>
{% endif %}
{% endblock %}"##;

const CASINO_TEMPLATE: &str = r##"{% extends "base.html" %}
{% import "macros.html" as m %}
{% block content %}
<h1>{{ casino.title }}</h1>
<p>{{ m::stars(avg=casino.ratingAvg, count=casino.ratingCount) }}</p>
{% if casino.bonusText %}<p class="mt-4">{{ casino.bonusText }}</p>{% endif %}
{% if casino.affiliateLink %}<p class="mt-4"><a class="btn btn-primary" href="{{ casino.affiliateLink }}" rel="nofollow sponsored noopener" target="_blank">Visit casino</a></p>{% endif %}
{% if casino.content %}<h2>Review</h2><div class="prose">{{ casino.content | safe }}</div>{% endif %}
{% if casino.author %}
<p class="mt-4 text-sm text-secondary">Reviewed by <a href="/authors/{{ casino.author.slug }}">{{ casino.author.name }}</a></p>
{% endif %}
{% endblock %}"##;

const GAMES_TEMPLATE: &str = r##"{% extends "base.html" %}
{% import "macros.html" as m %}
{% block content %}
<h1>Games</h1>
<form class="flex" method="get" action="/games">
    <input class="form" type="search" name="search" value="{{ search | default(value="") }}" placeholder="Search games">
    <button class="btn btn-secondary" type="submit">Search</button>
</form>
{% if listing.games %}
<p class="mt-4 text-sm text-secondary">{{ listing.total }} games</p>
<div class="grid mt-4">
    {% for game in listing.games %}{{ m::game_card(game=game, media_url=media_url) }}{% endfor %}
</div>
{{ m::pager(base="/games", page=listing.page, page_count=listing.pageCount, query=filter_query) }}
{% else %}
<div class="empty"><p>No games match these filters.</p></div>
{% endif %}
{% endblock %}"##;

const GAME_TEMPLATE: &str = r##"{% extends "base.html" %}
{% import "macros.html" as m %}
{% block content %}
<h1>{{ game.title }}</h1>
<p>
    {{ m::stars(avg=game.ratingAvg, count=game.ratingCount) }}
    {% if game.provider %}<span class="badge">{{ game.provider.title }}</span>{% endif %}
    {% for category in game.categories %}<span class="badge">{{ category.title }}</span>{% endfor %}
</p>
{% if game.images %}<img class="mt-4" src="{{ m::image(img=game.images, media_url=media_url) }}" alt="{{ game.title }}" style="max-width: 100%; border-radius: 14px;">{% endif %}
{% if game.content %}<div class="prose mt-4">{{ game.content | safe }}</div>{% endif %}
{% if related %}
<h2>More from {{ game.provider.title }}</h2>
<div class="grid">
    {% for other in related %}{{ m::game_card(game=other, media_url=media_url) }}{% endfor %}
</div>
{% endif %}
{% endblock %}"##;

const BLOGS_TEMPLATE: &str = r##"{% extends "base.html" %}
{% import "macros.html" as m %}
{% block content %}
<h1>Blog</h1>
{% if listing.items %}
<div class="grid">
    {% for blog in listing.items %}{{ m::blog_card(blog=blog, media_url=media_url) }}{% endfor %}
</div>
{{ m::pager(base="/blog", page=listing.page, page_count=listing.pageCount, query="") }}
{% else %}
<div class="empty"><p>No posts yet.</p></div>
{% endif %}
{% endblock %}"##;

const BLOG_TEMPLATE: &str = r##"{% extends "base.html" %}
{% import "macros.html" as m %}
{% block content %}
<h1>{{ blog.title }}</h1>
<p class="text-sm text-secondary">
    {% if blog.publishedAt %}{{ blog.publishedAt | truncate(length=10, end="") }}{% endif %}
    {% if blog.author %} &middot; <a href="/authors/{{ blog.author.slug }}">{{ blog.author.name }}</a>{% endif %}
</p>
{% if blog.image %}<img class="mt-4" src="{{ m::image(img=blog.image, media_url=media_url) }}" alt="{{ blog.title }}" style="max-width: 100%; border-radius: 14px;">{% endif %}
{% if blog.content %}<div class="prose mt-4">{{ blog.content | safe }}</div>{% endif %}
{% endblock %}"##;

const AUTHOR_TEMPLATE: &str = r##"{% extends "base.html" %}
{% import "macros.html" as m %}
{% block content %}
<h1>{{ profile.author.name }}</h1>
{% if profile.author.jobTitle %}<p class="text-secondary">{{ profile.author.jobTitle }}</p>{% endif %}
{% if profile.author.bio %}<div class="prose mt-4">{{ profile.author.bio | safe }}</div>{% endif %}

{% if profile.casinos %}
<h2>Casino reviews</h2>
<div class="grid">
    {% for casino in profile.casinos %}{{ m::casino_card(casino=casino, media_url=media_url) }}{% endfor %}
</div>
{% endif %}

{% if profile.blogs %}
<h2>Articles</h2>
<div class="grid">
    {% for blog in profile.blogs %}{{ m::blog_card(blog=blog, media_url=media_url) }}{% endfor %}
</div>
{% endif %}
{% endblock %}"##;

const DASHBOARD_TEMPLATE: &str = r##"{% extends "base.html" %}
{% block title %}Dashboard | {{ site_name }}{% endblock %}
{% block content %}
<h1>Welcome, {{ user.username }}</h1>
<div class="card">
    <div class="card-body">
        <p><span class="text-secondary">Email:</span> {{ user.email }}</p>
        {% if user.createdAt %}<p><span class="text-secondary">Member since:</span> {{ user.createdAt | truncate(length=10, end="") }}</p>{% endif %}
        {% if not user.confirmed %}<p class="mt-4 text-sm text-secondary">Your email address is not confirmed yet.</p>{% endif %}
    </div>
</div>
<p class="mt-4"><a class="btn btn-secondary" href="/authentication/logout">Log out</a></p>
{% endblock %}"##;

const LOGIN_TEMPLATE: &str = r##"{% extends "base.html" %}
{% block title %}Log in | {{ site_name }}{% endblock %}
{% block content %}
<h1>Log in</h1>
{% if error %}<div class="alert alert-error">{{ error }}</div>{% endif %}
<form class="form" method="post" action="/authentication/login">
    <input type="hidden" name="next" value="{{ next | default(value="/dashboard") }}">
    <input type="text" name="identifier" placeholder="Email or username" required>
    <input type="password" name="password" placeholder="Password" required>
    <button class="btn btn-primary" type="submit">Log in</button>
</form>
<p class="mt-4 text-sm text-secondary">No account yet? <a href="/authentication/register">Register</a></p>
{% endblock %}"##;

const REGISTER_TEMPLATE: &str = r##"{% extends "base.html" %}
{% block title %}Register | {{ site_name }}{% endblock %}
{% block content %}
<h1>Create an account</h1>
{% if error %}<div class="alert alert-error">{{ error }}</div>{% endif %}
<form class="form" method="post" action="/authentication/register">
    <input type="text" name="username" placeholder="Username" required>
    <input type="email" name="email" placeholder="Email" required>
    <input type="password" name="password" placeholder="Password" required>
    <button class="btn btn-primary" type="submit">Register</button>
</form>
<p class="mt-4 text-sm text-secondary">Already registered? <a href="/authentication/login">Log in</a></p>
{% endblock %}"##;

const ERROR_TEMPLATE: &str = r##"{% extends "base.html" %}
{% block title %}{{ heading | default(value="Error") }} | {{ site_name }}{% endblock %}
{% block content %}
<div class="card">
    <div class="card-body" style="padding: 48px; text-align: center;">
        <h1 style="margin-bottom: 16px;">{{ heading | default(value="Something went wrong") }}</h1>
        <p class="text-secondary">{{ message }}</p>
        <a href="/" class="btn btn-secondary mt-4">Return home</a>
    </div>
</div>
{% endblock %}"##;

const SITEMAP_INDEX_TEMPLATE: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
{% for sitemap in sitemaps %}  <sitemap><loc>{{ sitemap }}</loc></sitemap>
{% endfor %}</sitemapindex>"##;

const URLSET_TEMPLATE: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
{% for entry in entries %}  <url><loc>{{ entry.loc }}</loc>{% if entry.lastmod %}<lastmod>{{ entry.lastmod }}</lastmod>{% endif %}</url>
{% endfor %}</urlset>"##;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_parse() {
        assert!(TEMPLATES.get_template_names().any(|name| name == "casino.html"));
    }

    #[test]
    fn test_error_page_renders() {
        let mut context = Context::new();
        context.insert("site_name", "Casino Reviews");
        context.insert("logged_in", &false);
        context.insert("message", "No such casino");
        let html = render("error.html", &context).unwrap();
        assert!(html.contains("No such casino"));
        assert!(html.contains("Log in"));
    }

    #[test]
    fn test_urlset_renders_entries() {
        let mut context = Context::new();
        context.insert(
            "entries",
            &serde_json::json!([
                { "loc": "https://x.example/games/starburst", "lastmod": "2026-01-02" },
                { "loc": "https://x.example/blog", "lastmod": null },
                { "loc": "https://x.example/games?a=1&b=<2>", "lastmod": null }
            ]),
        );
        let xml = render_xml("urlset.xml", &context).unwrap();
        assert!(xml.contains("<loc>https://x.example/games/starburst</loc><lastmod>2026-01-02</lastmod>"));
        assert!(xml.contains("<loc>https://x.example/blog</loc></url>"));
        assert!(xml.contains("<loc>https://x.example/games?a=1&amp;b=&lt;2&gt;</loc>"));
    }

    #[test]
    fn test_html_templates_keep_html_escaping() {
        assert!(!TEMPLATES.get_template_names().any(|name| name.ends_with(".xml")));
        assert_eq!(escape_xml("Tom's <b>"), "Tom&apos;s &lt;b&gt;");
    }
}
