//! Templated user messages, rendered with minijinja

pub const TECHNICAL_USER: &str = r"Analyze {{ ticker }} with the following indicator grid.

# PRICE & TREND
Current price: {{ current_price }}
- SMA 50: {{ sma_50 }} | SMA 200: {{ sma_200 }} | EMA 20: {{ ema_20 }}

# MOMENTUM
- RSI (14): {{ rsi }}
- Stochastic %K (14): {{ stoch_k }}
- MACD: line={{ macd }} | signal={{ macd_signal }} | hist={{ macd_hist }}

# VOLATILITY
- ATR (14): {{ atr }}
- Bollinger (20, 2): upper={{ bb_upper }} | lower={{ bb_lower }}
- Keltner upper: {{ kc_upper }}

# VOLUME
- OBV: {{ obv }}

# LEVELS
- Pivot: {{ pivot_point }} | R1: {{ r1 }} | S1: {{ s1 }}

Respond in markdown with these sections:
## TREND
## MOMENTUM
## VOLATILITY
## VOLUME & LEVELS
## TECHNICAL VERDICT
Primary signal: BULLISH / BEARISH / NEUTRAL, conviction: HIGH / MEDIUM / LOW, and the key trigger to watch.";

pub const FUNDAMENTAL_USER: &str = r"Analyze the fundamentals of {{ company_name }} ({{ ticker }}).
Sector: {{ sector }}
Market cap: {{ market_cap }}

Key metrics:
{% for metric in metrics -%}
- {{ metric.name }}: {{ metric.value }}
{% endfor %}
Respond in markdown with these sections:
## VALUATION
## PROFITABILITY
## FINANCIAL HEALTH
## GROWTH
## FUNDAMENTAL VERDICT
Rating: UNDERVALUED / FAIR / OVERVALUED with a one-line justification.";

pub const SENTIMENT_USER: &str = r"Analyze market sentiment for {{ ticker }}.

SENTIMENT SCORES
- Bullish: {{ bullish_percent }} | Bearish: {{ bearish_percent }}
- Company news score: {{ company_news_score }}
- Sector average bullish: {{ sector_average_bullish }} | sector news score: {{ sector_average_news_score }}
- Articles in last week: {{ articles_in_last_week }} | weekly average: {{ weekly_average }}

RECENT HEADLINES
{{ headlines }}

Respond in markdown with these sections:
## NEWS THEMES
## SENTIMENT POSITIONING
## CONTRARIAN SIGNALS
## SENTIMENT RATING
Rating: POSITIVE / NEUTRAL / NEGATIVE, confidence and buzz level versus the weekly average.";

pub const SUPERVISOR_USER: &str = r"Synthesize these three analyses for {{ ticker }}:

--- TECHNICAL ANALYSIS ---
{{ technical_report }}

--- FUNDAMENTAL ANALYSIS ---
{{ fundamental_report }}

--- SENTIMENT ANALYSIS ---
{{ sentiment_report }}

User's question: {{ query }}
User's portfolio:
{{ portfolio_summary }}
{% if position %}
Current position in {{ ticker }}: {{ position }}
{% endif %}
{%- if legacy %}
Provide your synthesis in this exact format:

## RECOMMENDATION
Action: [BUY / HOLD / SELL]
Confidence: [HIGH / MEDIUM / LOW]
Time Horizon: [Short-term (1-4 weeks) / Medium-term (1-6 months) / Long-term (6+ months)]
12-Month Price Target: $[price]

## INVESTMENT THESIS
[3-4 sentences referencing each analysis]

## KEY RISKS
1. [specific risk]
2. [specific risk]
3. [specific risk]

## KEY CATALYSTS
1. [specific catalyst with timeline if known]
2. [specific catalyst with timeline if known]
3. [specific catalyst with timeline if known]

## POSITION SIZING SUGGESTION
[1-2 sentences on allocation relative to the portfolio]
{%- endif %}";

pub const REPAIR: &str = r"The previous output was invalid. Error: {{ error }}. Return ONLY the corrected JSON object matching the schema.";

pub const INTENT_USER: &str = r"Query: {{ query }}
User Portfolio Holdings: [{{ symbols | join(', ') }}]";

pub const PORTFOLIO_SYSTEM: &str = r"You are a portfolio analyst specialized in the user's own holdings.

{% if holdings -%}
User portfolio (total equity: ~{{ total_equity }}):
{% for h in holdings -%}
- {{ h.symbol }}: {{ h.quantity }} shares @ {{ h.price }} (Avg: {{ h.average_cost }}, P&L: {{ h.pnl }} / {{ h.pnl_pct }})
{% endfor %}
{%- else -%}
The user has no portfolio data.
{%- endif %}

Answer the user's question mainly from this data. For questions about performance,
diversification or specific positions, use the numbers provided. Be concise and data-driven.";
