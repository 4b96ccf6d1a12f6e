//! Web platform element tables shared by the compiler and the runtime.

const HTML_TAGS: &str = "html,body,base,head,link,meta,style,title,\
    address,article,aside,footer,header,h1,h2,h3,h4,h5,h6,hgroup,nav,section,\
    div,dd,dl,dt,figcaption,figure,picture,hr,img,li,main,ol,p,pre,ul,\
    a,b,abbr,bdi,bdo,br,cite,code,data,dfn,em,i,kbd,mark,q,rp,rt,rtc,ruby,\
    s,samp,small,span,strong,sub,sup,time,u,var,wbr,area,audio,map,track,video,\
    embed,object,param,source,canvas,script,noscript,del,ins,\
    caption,col,colgroup,table,thead,tbody,td,th,tr,\
    button,datalist,fieldset,form,input,label,legend,meter,optgroup,option,\
    output,progress,select,textarea,\
    details,dialog,menu,menuitem,summary,\
    content,element,shadow,template,blockquote,iframe,tfoot";

// Only SVG elements that may contain children.
const SVG_TAGS: &str = "svg,animate,circle,clippath,cursor,defs,desc,ellipse,filter,font-face,\
    foreignObject,g,glyph,image,line,marker,mask,missing-glyph,path,pattern,\
    polygon,polyline,rect,switch,symbol,text,textpath,tspan,use,view";

const UNARY_TAGS: &str = "area,base,br,col,embed,frame,hr,img,input,isindex,keygen,\
    link,meta,param,source,track,wbr";

const CAN_BE_LEFT_OPEN_TAGS: &str = "colgroup,dd,dt,li,options,p,td,tfoot,th,thead,tr,source";

const NON_PHRASING_TAGS: &str = "address,article,aside,base,blockquote,body,caption,col,colgroup,dd,\
    details,dialog,div,dl,dt,fieldset,figcaption,figure,footer,form,\
    h1,h2,h3,h4,h5,h6,head,header,hgroup,hr,html,legend,li,menuitem,meta,\
    optgroup,option,param,rp,rt,source,style,summary,tbody,td,tfoot,th,thead,\
    title,tr,track";

const ACCEPT_VALUE: &str = "input,textarea,option,select,progress";

fn in_list(list: &str, tag: &str) -> bool {
    list.split(',').any(|t| t == tag)
}

pub fn is_html_tag(tag: &str) -> bool {
    in_list(HTML_TAGS, tag)
}

pub fn is_svg(tag: &str) -> bool {
    in_list(SVG_TAGS, tag)
}

pub fn is_reserved_tag(tag: &str) -> bool {
    is_html_tag(tag) || is_svg(tag)
}

pub fn get_tag_namespace(tag: &str) -> Option<&'static str> {
    if is_svg(tag) {
        Some("svg")
    } else if tag == "math" {
        Some("math")
    } else {
        None
    }
}

pub fn is_unary_tag(tag: &str) -> bool {
    in_list(UNARY_TAGS, tag)
}

pub fn can_be_left_open_tag(tag: &str) -> bool {
    in_list(CAN_BE_LEFT_OPEN_TAGS, tag)
}

pub fn is_non_phrasing_tag(tag: &str) -> bool {
    in_list(NON_PHRASING_TAGS, tag)
}

pub fn is_pre_tag(tag: &str) -> bool {
    tag == "pre"
}

/// Raw-text elements whose content is not parsed as markup.
pub fn is_plain_text_element(tag: &str) -> bool {
    matches!(tag.to_ascii_lowercase().as_str(), "script" | "style" | "textarea")
}

/// Attributes that must be bound as DOM properties rather than attributes.
pub fn must_use_prop(tag: &str, attr_type: Option<&str>, attr: &str) -> bool {
    (attr == "value" && in_list(ACCEPT_VALUE, tag) && attr_type != Some("button"))
        || (attr == "selected" && tag == "option")
        || (attr == "checked" && tag == "input")
        || (attr == "muted" && tag == "video")
}

pub fn parse_platform_tag_name(tag: &str) -> &str {
    tag
}
